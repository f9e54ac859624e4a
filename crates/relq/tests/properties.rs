//! Property coverage for the executor: count/fetch agreement, paging
//! invariants, and join cardinality.

use proptest::prelude::*;
use relq::prelude::*;
use std::sync::Arc;

fn schema() -> Arc<Schema> {
    let mut schema = Schema::new();
    schema
        .add_table(
            Table::new("member")
                .column("username", ValueType::Text)
                .column("age", ValueType::Int)
                .column("team_id", ValueType::Int),
        )
        .unwrap();
    schema
        .add_table(
            Table::new("team")
                .column("id", ValueType::Int)
                .column("name", ValueType::Text),
        )
        .unwrap();
    schema
        .add_relation(Relation::new("member_team", "member", "team_id", "team", "id"))
        .unwrap();

    Arc::new(schema)
}

fn session_with_ages(ages: &[i64]) -> Session {
    let mut session = Session::new(schema());
    for (i, age) in ages.iter().enumerate() {
        session
            .insert(
                "member",
                [
                    Value::Text(format!("m{i}")),
                    Value::Int(*age),
                    Value::Null,
                ],
            )
            .unwrap();
    }

    session
}

fn ages_strategy() -> impl Strategy<Value = Vec<i64>> {
    proptest::collection::vec(0i64..100, 0..32)
}

proptest! {
    #[test]
    fn count_matches_materialized_length(ages in ages_strategy(), threshold in 0i64..100) {
        let session = session_with_ages(&ages);
        let member = session.source("member").unwrap();
        let filter = member.column("age").unwrap().gte(threshold).unwrap();

        let fetched = session
            .select([member.column("age").unwrap()])
            .from(&member)
            .filter(filter.clone())
            .fetch()
            .unwrap();
        let count = session
            .select([member.column("age").unwrap()])
            .from(&member)
            .filter(filter)
            .fetch_count()
            .unwrap();

        prop_assert_eq!(count as usize, fetched.len());
    }

    #[test]
    fn page_total_is_invariant_under_slicing(
        ages in ages_strategy(),
        offset in 0u64..40,
        limit in 1u64..10,
    ) {
        let session = session_with_ages(&ages);
        let member = session.source("member").unwrap();

        let page = session
            .select([member.column("age").unwrap()])
            .from(&member)
            .order_by(member.column("age").unwrap(), Direction::Asc)
            .offset(offset)
            .limit(limit)
            .fetch_page()
            .unwrap();

        prop_assert_eq!(page.total() as usize, ages.len());
        prop_assert!(page.items().len() <= limit as usize);
    }

    #[test]
    fn pages_concatenate_to_the_full_ordered_result(
        ages in ages_strategy(),
        limit in 1u64..8,
    ) {
        let session = session_with_ages(&ages);
        let member = session.source("member").unwrap();
        let query = || {
            session
                .select([member.column("username").unwrap()])
                .from(&member)
                .order_by(member.column("age").unwrap(), Direction::Asc)
        };

        let full = query().fetch().unwrap();

        let mut paged = Vec::new();
        let mut offset = 0;
        loop {
            let page = query().offset(offset).limit(limit).fetch().unwrap();
            if page.is_empty() {
                break;
            }
            offset += page.len() as u64;
            paged.extend(page);
        }

        prop_assert_eq!(paged, full);
    }

    #[test]
    fn left_relation_join_preserves_member_cardinality(
        team_ids in proptest::collection::vec(1i64..5, 0..24),
    ) {
        let team_count = 3i64;
        let mut session = Session::new(schema());
        for id in 1..=team_count {
            session
                .insert("team", [Value::Int(id), Value::Text(format!("team{id}"))])
                .unwrap();
        }
        for (i, team_id) in team_ids.iter().enumerate() {
            session
                .insert(
                    "member",
                    [
                        Value::Text(format!("m{i}")),
                        Value::Int(0),
                        Value::Int(*team_id),
                    ],
                )
                .unwrap();
        }

        let member = session.source("member").unwrap();
        let team = session.source("team").unwrap();

        let left = session
            .select([member.column("username").unwrap()])
            .from(&member)
            .left_join("member_team", &team)
            .fetch()
            .unwrap();
        prop_assert_eq!(left.len(), team_ids.len());

        let inner = session
            .select([member.column("username").unwrap()])
            .from(&member)
            .join("member_team", &team)
            .fetch()
            .unwrap();
        let resolvable = team_ids.iter().filter(|id| **id <= team_count).count();
        prop_assert_eq!(inner.len(), resolvable);
    }
}
