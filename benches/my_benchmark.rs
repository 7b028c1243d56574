use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pql::ast::Expr;
use pql::{Column, Condition, DataType, Database, Table, Value, parse_sql, row, tokenize};
use std::hint::black_box;

const QUERY: &str = "SELECT u.id, u.name AS username, age * 2 FROM users AS u \
                     WHERE (age >= 18 AND active = TRUE) OR name = 'USER42'";

fn setup_populated_db(n: usize) -> Database {
    let mut db = Database::new();
    db.create_table(
        "users",
        vec![
            Column::new("id", DataType::Int),
            Column::new("name", DataType::Text),
            Column::new("age", DataType::Int),
            Column::new("active", DataType::Bool),
        ],
    )
    .unwrap();

    for i in 0..n {
        db.insert(
            "users",
            row![
                i as i64,
                Value::Text(format!("USER{i}").into()),
                (i % 100) as i64,
                i % 2 == 0
            ],
        )
        .unwrap();
    }
    db
}

fn users(db: &Database) -> &Table {
    db.get_table("users").unwrap()
}

fn bench_front_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("Front_End");
    group.bench_function("tokenize", |b| {
        b.iter(|| black_box(tokenize(black_box(QUERY)).unwrap()));
    });
    group.bench_function("tokenize_and_parse", |b| {
        b.iter(|| black_box(parse_sql(black_box(QUERY)).unwrap()));
    });
    group.finish();
}

fn bench_filter_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Filter_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let db = setup_populated_db(n);
            let predicate = Condition::new(Expr::column("AGE"), "=", Expr::literal(42_i64)).unwrap();
            b.iter(|| black_box(users(&db).filter(std::slice::from_ref(&predicate)).unwrap()));
        });
    }
    group.finish();
}

fn bench_project_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Project_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let db = setup_populated_db(n);
            b.iter(|| black_box(users(&db).project(&["NAME", "ID"]).unwrap()));
        });
    }
    group.finish();
}

fn bench_query_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("Select_Where_Performance");

    for n in [1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(n), n, |b, &n| {
            let db = setup_populated_db(n);
            b.iter(|| black_box(db.query(QUERY).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_front_end,
    bench_filter_scaling,
    bench_project_scaling,
    bench_query_scaling
);
criterion_main!(benches);
