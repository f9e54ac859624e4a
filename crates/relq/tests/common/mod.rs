use relq::prelude::*;
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// member(username, age, team_id) and team(id, name), with the
/// member_team relation declared on team_id = id.
pub fn schema() -> Arc<Schema> {
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

/// Two teams, four members: member1/member2 in teamA (ages 10, 20),
/// member3/member4 in teamB (ages 30, 40).
pub fn seeded_session() -> Session {
    init_tracing();
    let mut session = Session::new(schema());

    session
        .insert("team", [Value::Int(1), Value::Text("teamA".into())])
        .unwrap();
    session
        .insert("team", [Value::Int(2), Value::Text("teamB".into())])
        .unwrap();

    for (username, age, team_id) in [
        ("member1", 10, 1),
        ("member2", 20, 1),
        ("member3", 30, 2),
        ("member4", 40, 2),
    ] {
        session
            .insert(
                "member",
                [
                    Value::Text(username.into()),
                    Value::Int(age),
                    Value::Int(team_id),
                ],
            )
            .unwrap();
    }

    session
}

pub fn usernames(tuples: &[Tuple]) -> Vec<Value> {
    tuples
        .iter()
        .map(|tuple| tuple.get_at(0).cloned().unwrap())
        .collect()
}

pub fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}
