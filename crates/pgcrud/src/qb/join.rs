//! Join resolver: derives the FROM clause from declared relations.
//!
//! Every unordered pair of registrations is inspected once, in registration
//! order. When either side declares a relation to the other, the pair is
//! linked into a join chain with an `ON owner.field=target.key` condition.
//! Registrations that never link to anything stay singletons and are
//! cross-joined with a comma.

use crate::qb::registry::{Registration, Registry};

/// `ON` condition for `owner`'s relation to `target`, if `owner` declares one.
pub fn relation_condition(owner: &Registration, target: &Registration) -> Option<String> {
    owner
        .relation_to(target)
        .map(|rel| format!("{}={}", owner.qualified(&rel.field), target.qualified(&rel.key)))
}

/// Try `a -> b`, then `b -> a`. The first direction that resolves wins.
pub fn resolve_relation(a: &Registration, b: &Registration) -> Option<String> {
    relation_condition(a, b).or_else(|| relation_condition(b, a))
}

/// One member of a join chain. The anchor has no condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainLink {
    /// Index into the registry.
    pub index: usize,
    pub on: Option<String>,
}

/// Resolved FROM layout.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JoinPlan {
    /// Unrelated registrations, in registration order.
    pub singletons: Vec<usize>,
    pub chains: Vec<Vec<ChainLink>>,
}

impl JoinPlan {
    pub fn resolve(registry: &Registry) -> Self {
        let entries = registry.entries();
        let mut chain_of: Vec<Option<usize>> = vec![None; entries.len()];
        let mut chains: Vec<Vec<ChainLink>> = Vec::new();

        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                if chain_of[i].is_some() && chain_of[j].is_some() {
                    continue;
                }
                let Some(on) = resolve_relation(&entries[i], &entries[j]) else {
                    continue;
                };
                match (chain_of[i], chain_of[j]) {
                    (Some(c), None) => {
                        chains[c].push(ChainLink { index: j, on: Some(on) });
                        chain_of[j] = Some(c);
                    }
                    (None, Some(c)) => {
                        chains[c].push(ChainLink { index: i, on: Some(on) });
                        chain_of[i] = Some(c);
                    }
                    (None, None) => {
                        let c = chains.len();
                        chains.push(vec![
                            ChainLink { index: i, on: None },
                            ChainLink { index: j, on: Some(on) },
                        ]);
                        chain_of[i] = Some(c);
                        chain_of[j] = Some(c);
                    }
                    (Some(_), Some(_)) => {}
                }
            }
        }

        let singletons = (0..entries.len())
            .filter(|&i| chain_of[i].is_none())
            .collect();
        Self { singletons, chains }
    }

    /// Render the FROM list (without the `FROM` keyword).
    pub fn render(&self, registry: &Registry) -> String {
        let entries = registry.entries();
        let mut groups: Vec<String> = self
            .singletons
            .iter()
            .map(|&i| entries[i].from_source())
            .collect();

        for chain in &self.chains {
            let mut sql = String::new();
            for link in chain {
                let reg = &entries[link.index];
                match &link.on {
                    None => sql.push_str(&reg.from_source()),
                    Some(on) => {
                        sql.push(' ');
                        sql.push_str(reg.join.as_sql());
                        sql.push(' ');
                        sql.push_str(&reg.from_source());
                        sql.push_str(" ON ");
                        sql.push_str(on);
                    }
                }
            }
            groups.push(sql);
        }
        groups.join(", ")
    }
}

/// Resolve and render the FROM list of `registry`.
pub fn render_from(registry: &Registry) -> String {
    JoinPlan::resolve(registry).render(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{DerivedTable, NamedTable, Relation, TableRef};
    use crate::qb::registry::JoinKind;

    fn crud1() -> TableRef {
        TableRef::named(
            NamedTable::new("table1", ["id", "key", "title"])
                .use_timestamp(true)
                .relation(Relation::to_kind("key", "table2", "id")),
        )
    }

    fn crud2() -> TableRef {
        TableRef::named(NamedTable::new("table2", ["id", "key", "title"]))
    }

    #[test]
    fn single_table() {
        let t = crud1();
        let mut reg = Registry::new();
        reg.register(&t, "c1", JoinKind::Join, Vec::new());
        assert_eq!(render_from(&reg), "table1 C1");
    }

    #[test]
    fn relation_declared_on_first() {
        let (t1, t2) = (crud1(), crud2());
        let mut reg = Registry::new();
        reg.register(&t1, "c1", JoinKind::Join, Vec::new());
        reg.register(&t2, "c2", JoinKind::Join, Vec::new());
        assert_eq!(render_from(&reg), "table1 C1 JOIN table2 C2 ON C1.key=C2.id");
    }

    #[test]
    fn relation_found_in_reverse_direction() {
        let (t1, t2) = (crud1(), crud2());
        let mut reg = Registry::new();
        reg.register(&t2, "c2", JoinKind::Left, Vec::new());
        reg.register(&t1, "c1", JoinKind::Left, Vec::new());
        assert_eq!(render_from(&reg), "table2 C2 LEFT JOIN table1 C1 ON C1.key=C2.id");
    }

    #[test]
    fn derived_table_relation() {
        let t1 = crud1();
        let sub = TableRef::derived(
            DerivedTable::new("SELECT 1 as key").relation(Relation::to_kind("id", "table1", "key")),
        );
        let mut reg = Registry::new();
        reg.register(&t1, "c1", JoinKind::Join, Vec::new());
        reg.register(&sub, "c2", JoinKind::Join, Vec::new());
        assert_eq!(
            render_from(&reg),
            "table1 C1 JOIN (SELECT 1 as key) C2 ON C2.id=C1.key"
        );
    }

    #[test]
    fn registration_relations_override() {
        let t1 = crud1();
        let sub = TableRef::derived(DerivedTable::new("SELECT 1 as key"));
        let mut reg = Registry::new();
        reg.register(
            &t1,
            "c1",
            JoinKind::Join,
            vec![Relation::to_table("key", &sub, "id")],
        );
        reg.register(&sub, "c2", JoinKind::Join, Vec::new());
        assert_eq!(
            render_from(&reg),
            "table1 C1 JOIN (SELECT 1 as key) C2 ON C1.key=C2.id"
        );
    }

    #[test]
    fn alias_relation_on_derived_table() {
        let t1 = crud1();
        let sub = TableRef::derived(
            DerivedTable::new("SELECT 1 as key").relation(Relation::to_alias("key", "c1", "id")),
        );
        let mut reg = Registry::new();
        reg.register(&t1, "c1", JoinKind::Join, Vec::new());
        reg.register(&sub, "c2", JoinKind::Join, Vec::new());
        assert_eq!(
            render_from(&reg),
            "table1 C1 JOIN (SELECT 1 as key) C2 ON C2.key=C1.id"
        );
    }

    #[test]
    fn unrelated_tables_are_cross_joined() {
        let t1 = crud1();
        let sub = TableRef::derived(DerivedTable::new("SELECT 1 as key"));
        let mut reg = Registry::new();
        reg.register(&t1, "c1", JoinKind::Join, Vec::new());
        reg.register(&sub, "c2", JoinKind::Join, Vec::new());
        assert_eq!(render_from(&reg), "table1 C1, (SELECT 1 as key) C2");
    }

    #[test]
    fn singletons_render_before_chains() {
        let (t1, t2) = (crud1(), crud2());
        let other = TableRef::named(NamedTable::new("other", ["id"]));
        let mut reg = Registry::new();
        reg.register(&t1, "c1", JoinKind::Join, Vec::new());
        reg.register(&t2, "c2", JoinKind::Join, Vec::new());
        reg.register(&other, "o", JoinKind::Join, Vec::new());
        assert_eq!(
            render_from(&reg),
            "other O, table1 C1 JOIN table2 C2 ON C1.key=C2.id"
        );
    }

    #[test]
    fn chained_member_pulls_in_third() {
        let users = TableRef::named(NamedTable::new("users", ["id"]));
        let posts = TableRef::named(
            NamedTable::new("posts", ["id", "user_id"]).relation(Relation::to_kind("user_id", "users", "id")),
        );
        let comments = TableRef::named(
            NamedTable::new("comments", ["id", "post_id"])
                .relation(Relation::to_kind("post_id", "posts", "id")),
        );
        let mut reg = Registry::new();
        reg.register(&users, "u", JoinKind::Join, Vec::new());
        reg.register(&posts, "p", JoinKind::Join, Vec::new());
        reg.register(&comments, "c", JoinKind::Left, Vec::new());

        let plan = JoinPlan::resolve(&reg);
        assert!(plan.singletons.is_empty());
        assert_eq!(plan.chains.len(), 1);
        assert_eq!(
            plan.render(&reg),
            "users U JOIN posts P ON P.user_id=U.id LEFT JOIN comments C ON C.post_id=P.id"
        );
    }

    #[test]
    fn symmetric_on_content() {
        let (t1, t2) = (crud1(), crud2());
        let mut forward = Registry::new();
        forward.register(&t1, "c1", JoinKind::Join, Vec::new());
        forward.register(&t2, "c2", JoinKind::Join, Vec::new());
        let mut backward = Registry::new();
        backward.register(&t2, "c2", JoinKind::Join, Vec::new());
        backward.register(&t1, "c1", JoinKind::Join, Vec::new());

        let on = |reg: &Registry| resolve_relation(&reg.entries()[0], &reg.entries()[1]);
        assert_eq!(on(&forward), Some("C1.key=C2.id".to_string()));
        assert_eq!(on(&forward), on(&backward));
    }
}
