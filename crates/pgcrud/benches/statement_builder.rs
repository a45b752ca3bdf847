use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgcrud::qb::{self, Cond, SelectQb};
use pgcrud::{NamedTable, Relation, TableRef};

/// A chain of `n` tables where table `i` references table `i - 1`.
fn chained_tables(n: usize) -> Vec<TableRef> {
    let mut tables: Vec<TableRef> = Vec::with_capacity(n);
    for i in 0..n {
        let mut table = NamedTable::new(format!("t{i}"), ["id", "parent_id", "name"]);
        if let Some(parent) = tables.last() {
            table = table.relation(Relation::to_table("parent_id", parent, "id"));
        }
        tables.push(TableRef::named(table));
    }
    tables
}

fn select_over(tables: &[TableRef]) -> SelectQb {
    let mut select = SelectQb::new();
    for (i, table) in tables.iter().enumerate() {
        select = select.table(table, &format!("c{i}"));
    }
    select
}

fn bench_join_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/join_resolution");

    for n in [2, 4, 8, 16] {
        let tables = chained_tables(n);
        let select = select_over(&tables);
        group.bench_with_input(BenchmarkId::from_parameter(n), &select, |b, select| {
            b.iter(|| black_box(qb::render_from(select.registry())));
        });
    }

    group.finish();
}

fn bench_select_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/select_build");

    for n in [1, 5, 10, 50] {
        let tables = chained_tables(3);
        let mut select = select_over(&tables);
        for i in 0..n {
            select = select.filter(Cond::on(&tables[i % 3], "name", format!("v{i}")));
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &select, |b, select| {
            b.iter(|| black_box(select.build()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_join_resolution, bench_select_build);
criterion_main!(benches);
