//! Runs a greeting script, calls back into it from Rust, and shows guest warnings arriving
//! through the `log` crate.
//!
//! ```bash
//! cargo run --example hello
//! ```

use log::{LevelFilter, Log, Metadata, Record};
use pluto::prelude::*;
use std::path::PathBuf;

/// Prints every record to stderr.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        eprintln!("[{} {}] {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn main() -> Result<(), LuaError> {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }

    let lua = Lua::with_options(LuaOptions::new().libs(StdLib::ALL).warnings(true))?;

    if lua.do_string("print('Hello World')")? {
        eprintln!("error: {}", lua.take_error_message()?);
    }

    let script = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_scripts")
        .join("greeting.lua");
    lua.exec_file(&script)?;
    println!("script returned: {}", lua.to_string(-1)?.unwrap_or_default());
    lua.set_top(0)?;

    lua.get_global("greet")?;
    lua.push("Rust")?;
    match lua.pcall(1, 1, 0)? {
        LuaStatus::Ok => println!("greet(\"Rust\") = {}", lua.to_string(-1)?.unwrap_or_default()),
        status => eprintln!("greet failed with {:?}: {}", status, lua.take_error_message()?),
    }
    lua.set_top(0)?;

    lua.exec_string("warn('greeted ', tostring(greeting_count()), ' times')")?;

    match lua.exec_string("this is not lua") {
        Err(LuaError::Status { status, message }) => println!("{:?}: {}", status, message),
        other => println!("unexpected: {:?}", other),
    }

    Ok(())
}
