//! Benchmarks for the state facade: creation, chunk loading, protected calls and stack
//! traffic across the boundary.
//!
//! ```bash
//! cargo bench --bench state_benchmarks
//! ```

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use pluto::prelude::*;
use std::hint::black_box;

const FIBONACCI: &str = r#"
local function fib(n)
  if n < 2 then return n end
  return fib(n - 1) + fib(n - 2)
end
return fib(20)
"#;

fn lifecycle_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("state/lifecycle");

    group.bench_function("new_and_close", |b| {
        b.iter(|| {
            let mut lua = Lua::new().unwrap();
            lua.close();
            black_box(lua.is_closed())
        });
    });

    group.bench_function("new_with_all_libs", |b| {
        b.iter(|| black_box(Lua::with_options(LuaOptions::new().libs(StdLib::ALL)).unwrap()));
    });

    group.finish();
}

fn execution_benchmarks(c: &mut Criterion) {
    let lua = Lua::new().unwrap();
    let mut group = c.benchmark_group("state/execution");
    group.throughput(Throughput::Bytes(FIBONACCI.len() as u64));

    group.bench_function("load_string", |b| {
        b.iter(|| {
            let status = lua.load_string(black_box(FIBONACCI)).unwrap();
            lua.pop(1).unwrap();
            status
        });
    });

    group.bench_function("exec_fibonacci_20", |b| {
        b.iter(|| {
            lua.exec_string(black_box(FIBONACCI)).unwrap();
            let result = lua.to_integer(-1).unwrap();
            lua.set_top(0).unwrap();
            result
        });
    });

    lua.exec_string("function add(a, b) return a + b end").unwrap();
    group.bench_function("pcall_global_function", |b| {
        b.iter(|| {
            lua.get_global("add").unwrap();
            lua.push_integer(black_box(20)).unwrap();
            lua.push_integer(black_box(22)).unwrap();
            lua.pcall(2, 1, 0).unwrap();
            let result = lua.to_integer(-1).unwrap();
            lua.pop(1).unwrap();
            result
        });
    });

    group.finish();
}

fn stack_benchmarks(c: &mut Criterion) {
    let lua = Lua::new().unwrap();
    let mut group = c.benchmark_group("state/stack");

    group.bench_function("push_and_read_string", |b| {
        b.iter(|| {
            lua.push_string(black_box("a short string")).unwrap();
            let value = lua.to_string(-1).unwrap();
            lua.pop(1).unwrap();
            value
        });
    });

    group.bench_function("table_field_round_trip", |b| {
        lua.new_table().unwrap();
        b.iter(|| {
            lua.push_integer(black_box(7)).unwrap();
            lua.set_field(-2, "value").unwrap();
            lua.get_field(-1, "value").unwrap();
            let value = lua.to_integer(-1).unwrap();
            lua.pop(1).unwrap();
            value
        });
        lua.set_top(0).unwrap();
    });

    group.bench_function("pin_and_take_user_data", |b| {
        b.iter(|| {
            lua.push_light_user_data(black_box(vec![1u8; 16])).unwrap();
            let value = lua.take_user_data::<Vec<u8>>(-1).unwrap();
            lua.pop(1).unwrap();
            value
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    lifecycle_benchmarks,
    execution_benchmarks,
    stack_benchmarks
);
criterion_main!(benches);
