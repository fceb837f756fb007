use std::env;
use std::fs;
use std::path::{Path, PathBuf};

// Stand-alone programs shipped in Lua and Pluto source trees. They carry their own `main`.
const SKIPPED_SOURCES: &[&str] = &["lua.c", "luac.c", "onelua.c", "pluto.cpp", "plutoc.cpp"];

const PKG_CONFIG_NAMES: &[&str] = &["pluto", "lua5.4", "lua-5.4", "lua54", "lua"];

fn main() {
    println!("cargo:rerun-if-env-changed=PLUTO_SRC_DIR");
    println!("cargo:rerun-if-env-changed=PLUTO_LIB_DIR");
    println!("cargo:rerun-if-env-changed=PLUTO_LIB_NAME");
    println!("cargo:rerun-if-env-changed=PLUTO_STATIC");

    if let Some(src_dir) = env::var_os("PLUTO_SRC_DIR") {
        build_from_source(Path::new(&src_dir));
        return;
    }

    if let Some(lib_dir) = env::var_os("PLUTO_LIB_DIR") {
        link_prebuilt(Path::new(&lib_dir));
        return;
    }

    if build_vendored() || probe_pkg_config() {
        return;
    }

    panic!(
        "pluto-sys: could not locate the Pluto/Lua 5.4 native library.\n\
         Set PLUTO_SRC_DIR to a source tree to compile, set PLUTO_LIB_DIR \
         (and optionally PLUTO_LIB_NAME) to a prebuilt library, enable the \
         `vendored` feature, or install a pkg-config entry named one of: {}",
        PKG_CONFIG_NAMES.join(", ")
    );
}

/// Stock Lua 5.4; Pluto's syntax extensions need `PLUTO_SRC_DIR` or `PLUTO_LIB_DIR`.
#[cfg(feature = "vendored")]
fn build_vendored() -> bool {
    let artifacts = lua_src::Build::new().build(lua_src::Lua54);
    artifacts.print_cargo_metadata();
    true
}

#[cfg(not(feature = "vendored"))]
fn build_vendored() -> bool {
    false
}

fn build_from_source(src_dir: &Path) {
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap();

    let entries = fs::read_dir(src_dir).unwrap_or_else(|e| {
        panic!(
            "pluto-sys: PLUTO_SRC_DIR {} is not readable: {}",
            src_dir.display(),
            e
        )
    });

    let mut sources: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            let is_source = matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("c") | Some("cpp")
            );
            let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            is_source && !SKIPPED_SOURCES.contains(&file_name)
        })
        .collect();
    sources.sort();

    if sources.is_empty() {
        panic!(
            "pluto-sys: PLUTO_SRC_DIR {} contains no C or C++ sources",
            src_dir.display()
        );
    }

    // Pluto is written in C++; stock Lua is C. A tree is compiled in one language.
    let is_cpp = sources
        .iter()
        .any(|path| path.extension().and_then(|ext| ext.to_str()) == Some("cpp"));

    let mut build = cc::Build::new();
    build.include(src_dir).files(&sources).warnings(false);

    if is_cpp {
        build.cpp(true).flag_if_supported("-std=c++17");
    }

    match target_os.as_str() {
        "linux" => {
            build.define("LUA_USE_LINUX", None);
        }
        "macos" => {
            build.define("LUA_USE_MACOSX", None);
            build.flag("-mmacosx-version-min=10.15");
        }
        "windows" => {
            build.define("LUA_USE_WINDOWS", None);
        }
        _ => {
            build.define("LUA_USE_POSIX", None);
        }
    }

    build.compile("pluto");

    if target_os == "linux" {
        println!("cargo:rustc-link-lib=dylib=m");
        println!("cargo:rustc-link-lib=dylib=dl");
    }

    println!("cargo:rerun-if-changed={}", src_dir.display());
}

fn link_prebuilt(lib_dir: &Path) {
    if !lib_dir.is_dir() {
        panic!(
            "pluto-sys: PLUTO_LIB_DIR {} is not a directory",
            lib_dir.display()
        );
    }

    let lib_name = env::var("PLUTO_LIB_NAME").unwrap_or_else(|_| "lua54".to_string());
    let kind = if env::var_os("PLUTO_STATIC").is_some() {
        "static"
    } else {
        "dylib"
    };

    println!("cargo:rustc-link-search=native={}", lib_dir.display());
    println!("cargo:rustc-link-lib={}={}", kind, lib_name);
}

fn probe_pkg_config() -> bool {
    PKG_CONFIG_NAMES.iter().any(|name| {
        pkg_config::Config::new()
            .atleast_version("5.4")
            .probe(name)
            .is_ok()
    })
}
