//! Module: sql
//! Responsibility: rendering plans and mutations as parameterized SQL text.
//! Does not own: plan legality; select rendering validates first.
//! Boundary: diagnostic and interop surface only; execution never routes
//! through the rendered text.

use crate::{
    error::Error,
    expr::Expr,
    mutation::{Delete, Update},
    plan::{Direction, JoinKind, NullOrdering, PlanError, QueryPlan, validate::validate},
    schema::Schema,
    value::Value,
};

///
/// Statement
///
/// SQL text with positional `?` placeholders and their bound values in
/// placeholder order.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Statement {
    text: String,
    params: Vec<Value>,
}

impl Statement {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Render a select plan. The plan is validated against the schema first,
/// so the emitted text never names an unresolvable table or alias.
pub fn render_select(schema: &Schema, plan: &QueryPlan) -> Result<Statement, Error> {
    validate(schema, plan)?;

    let mut writer = SqlWriter::new(schema);
    writer.write_plan(plan)?;

    Ok(writer.finish())
}

/// Render a bulk update. Set and filter expressions may embed
/// subqueries, so rendering is as fallible as the select path.
pub(crate) fn render_update(update: &Update) -> Result<Statement, Error> {
    let mut writer = SqlWriter::new(update.source().schema());
    writer.push("update ");
    writer.push(update.source().table());

    for (i, (column, value)) in update.sets().iter().enumerate() {
        writer.push(if i == 0 { " set " } else { ", " });
        writer.push(column);
        writer.push(" = ");
        writer.write_expr(value)?;
    }
    if let Some(filter) = update.filter_pred() {
        writer.push(" where ");
        writer.write_expr(filter.expr())?;
    }

    Ok(writer.finish())
}

pub(crate) fn render_delete(delete: &Delete) -> Result<Statement, Error> {
    let mut writer = SqlWriter::new(delete.source().schema());
    writer.push("delete from ");
    writer.push(delete.source().table());
    if let Some(filter) = delete.filter_pred() {
        writer.push(" where ");
        writer.write_expr(filter.expr())?;
    }

    Ok(writer.finish())
}

struct SqlWriter<'a> {
    schema: &'a Schema,
    text: String,
    params: Vec<Value>,
}

impl<'a> SqlWriter<'a> {
    const fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            text: String::new(),
            params: Vec::new(),
        }
    }

    fn finish(self) -> Statement {
        Statement {
            text: self.text,
            params: self.params,
        }
    }

    fn push(&mut self, text: &str) {
        self.text.push_str(text);
    }

    fn bind(&mut self, value: Value) {
        self.params.push(value);
        self.text.push('?');
    }

    fn write_plan(&mut self, plan: &QueryPlan) -> Result<(), Error> {
        self.push("select ");
        for (i, expr) in plan.select().iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.write_expr(expr)?;
        }

        for (i, source) in plan.sources().iter().enumerate() {
            self.push(if i == 0 { " from " } else { ", " });
            self.write_source(&source.table, &source.alias);
        }

        for join in plan.joins() {
            self.push(match join.kind {
                JoinKind::Inner => " join ",
                JoinKind::Left => " left join ",
            });
            self.write_source(&join.source.table, &join.source.alias);
            self.push(" on ");
            self.write_join_condition(plan, join)?;
        }

        if let Some(filter) = plan.filter() {
            self.push(" where ");
            self.write_expr(filter.expr())?;
        }

        for (i, key) in plan.group_by().iter().enumerate() {
            self.push(if i == 0 { " group by " } else { ", " });
            self.write_expr(key)?;
        }

        for (i, spec) in plan.order_by().iter().enumerate() {
            self.push(if i == 0 { " order by " } else { ", " });
            self.write_expr(&spec.expr)?;
            self.push(match spec.direction {
                Direction::Asc => " asc",
                Direction::Desc => " desc",
            });
            self.push(match spec.nulls {
                NullOrdering::First => " nulls first",
                NullOrdering::Last => " nulls last",
            });
        }

        if let Some(limit) = plan.limit() {
            self.push(&format!(" limit {limit}"));
        }
        if let Some(offset) = plan.offset() {
            self.push(&format!(" offset {offset}"));
        }

        Ok(())
    }

    fn write_source(&mut self, table: &str, alias: &str) {
        self.push(table);
        if alias != table {
            self.push(" ");
            self.push(alias);
        }
    }

    fn write_join_condition(
        &mut self,
        plan: &QueryPlan,
        join: &crate::plan::JoinClause,
    ) -> Result<(), Error> {
        let Some(relation_name) = &join.relation else {
            let on = join.on.as_ref().ok_or(Error::Plan(PlanError::DanglingOn))?;
            return self.write_expr(on.expr());
        };

        let relation = self
            .schema
            .relation(relation_name)
            .ok_or_else(|| PlanError::UnknownRelation(relation_name.clone()))?;

        // Validation already placed the owning side in scope.
        let owner_alias = plan
            .sources()
            .iter()
            .chain(plan.joins().iter().map(|other| &other.source))
            .take_while(|source| source.alias != join.source.alias)
            .find(|source| source.table == relation.source)
            .map_or(relation.source.as_str(), |source| source.alias.as_str());

        self.push(owner_alias);
        self.push(".");
        self.push(&relation.source_column);
        self.push(" = ");
        self.push(&join.source.alias);
        self.push(".");
        self.push(&relation.target_column);

        if let Some(extra) = &join.on {
            self.push(" and ");
            self.write_expr(extra.expr())?;
        }

        Ok(())
    }

    fn write_expr(&mut self, expr: &Expr) -> Result<(), Error> {
        match expr {
            Expr::Column { source, column, .. } => {
                self.push(source);
                self.push(".");
                self.push(column);
            }
            Expr::Constant(Value::List(values)) => {
                self.push("(");
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.bind(value.clone());
                }
                self.push(")");
            }
            Expr::Constant(value) => self.bind(value.clone()),
            Expr::EntityRef { source, .. } => {
                self.push(source);
                self.push(".*");
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                self.push("(");
                self.write_expr(lhs)?;
                self.push(" ");
                self.push(op.symbol());
                self.push(" ");
                self.write_expr(rhs)?;
                self.push(")");
            }
            Expr::Not(inner) => {
                self.push("not (");
                self.write_expr(inner)?;
                self.push(")");
            }
            Expr::IsNull(inner) => {
                self.push("(");
                self.write_expr(inner)?;
                self.push(" is null)");
            }
            Expr::Case {
                branches,
                otherwise,
                ..
            } => {
                self.push("case");
                for (when, then) in branches {
                    self.push(" when ");
                    self.write_expr(when)?;
                    self.push(" then ");
                    self.write_expr(then)?;
                }
                if let Some(otherwise) = otherwise {
                    self.push(" else ");
                    self.write_expr(otherwise)?;
                }
                self.push(" end");
            }
            Expr::Aggregate { func, arg, .. } => {
                self.push(&func.to_string());
                self.push("(");
                match arg {
                    Some(arg) => self.write_expr(arg)?,
                    None => self.push("*"),
                }
                self.push(")");
            }
            Expr::Subquery { plan, .. } => {
                self.push("(");
                self.write_plan(plan)?;
                self.push(")");
            }
            Expr::Cast { inner, .. } => {
                self.push("cast(");
                self.write_expr(inner)?;
                self.push(" as text)");
            }
            Expr::StringFn { func, args } => {
                self.push(&func.to_string());
                self.push("(");
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.push(", ");
                    }
                    self.write_expr(arg)?;
                }
                self.push(")");
            }
            Expr::Alias { inner, name } => {
                self.write_expr(inner)?;
                self.push(" as ");
                self.push(name);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        expr::SourceRef,
        plan::PlanBuilder,
        schema::{Relation, Table},
        value::ValueType,
    };
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

    #[test]
    fn select_renders_with_positional_params() {
        let schema = schema();
        let member = SourceRef::new(&schema, "member").unwrap();
        let plan = PlanBuilder::select([member.column("username").unwrap()])
            .from(&member)
            .filter(member.column("age").unwrap().gte(20).unwrap())
            .limit(3)
            .build()
            .unwrap();

        let statement = render_select(&schema, &plan).unwrap();
        assert_eq!(
            statement.text(),
            "select member.username from member where (member.age >= ?) limit 3"
        );
        assert_eq!(statement.params(), &[Value::Int(20)]);
    }

    #[test]
    fn relation_join_renders_its_key_equality() {
        let schema = schema();
        let member = SourceRef::new(&schema, "member").unwrap();
        let team = SourceRef::new(&schema, "team").unwrap();
        let plan = PlanBuilder::select([member.column("username").unwrap()])
            .from(&member)
            .join("member_team", &team)
            .build()
            .unwrap();

        let statement = render_select(&schema, &plan).unwrap();
        assert_eq!(
            statement.text(),
            "select member.username from member join team on member.team_id = team.id"
        );
    }

    #[test]
    fn string_functions_render_as_calls() {
        let schema = schema();
        let member = SourceRef::new(&schema, "member").unwrap();
        let plan = PlanBuilder::select([
            member
                .column("username")
                .unwrap()
                .replace("member", "M")
                .unwrap(),
        ])
        .from(&member)
        .filter(
            member
                .column("username")
                .unwrap()
                .lower()
                .unwrap()
                .eq("member1")
                .unwrap(),
        )
        .build()
        .unwrap();

        let statement = render_select(&schema, &plan).unwrap();
        assert_eq!(
            statement.text(),
            "select replace(member.username, ?, ?) from member \
             where (lower(member.username) = ?)"
        );
        assert_eq!(
            statement.params(),
            &[
                Value::Text("member".into()),
                Value::Text("M".into()),
                Value::Text("member1".into())
            ]
        );
    }

    #[test]
    fn in_list_binds_one_param_per_element() {
        let schema = schema();
        let member = SourceRef::new(&schema, "member").unwrap();
        let plan = PlanBuilder::select([member.column("username").unwrap()])
            .from(&member)
            .filter(member.column("age").unwrap().in_list([20, 30]).unwrap())
            .build()
            .unwrap();

        let statement = render_select(&schema, &plan).unwrap();
        assert_eq!(
            statement.text(),
            "select member.username from member where (member.age in (?, ?))"
        );
        assert_eq!(statement.params(), &[Value::Int(20), Value::Int(30)]);
    }
}
