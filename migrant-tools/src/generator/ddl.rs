use itertools::Itertools;
use crate::dialect::Dialect;
use crate::models::{ForeignKey, Identifier, Index, ReferenceAction, Sequence, TableRef, Trigger, TriggerType};

pub struct DdlQueryBuilder<'d> {
    sql: String,
    dialect: &'d dyn Dialect,
}

impl<'d> DdlQueryBuilder<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            sql: String::new(),
            dialect,
        }
    }

    pub fn create_table(&mut self, table: &TableRef) -> DdlTableBuilder<'d, '_> {
        self.sql.push_str(&format!("create table {} (", self.dialect.qualify(table)));

        DdlTableBuilder {
            query_builder: self,
            has_first_line: false,
        }
    }

    pub fn build(mut self) -> String {
        self.sql.push_str("\n)");

        self.sql
    }
}

pub struct DdlTableBuilder<'d, 'b> {
    query_builder: &'b mut DdlQueryBuilder<'d>,
    has_first_line: bool,
}

impl<'d, 'b> DdlTableBuilder<'d, 'b> {
    pub fn column<'c>(&'c mut self, name: &str, data_type: &str) -> DdlTableColumnBuilder<'c> {
        let name = self.query_builder.dialect.quote_column(name);
        self.start_new_line();
        self.query_builder.sql.push_str(&format!("    {} {}", name, data_type));

        DdlTableColumnBuilder {
            sql: &mut self.query_builder.sql,
        }
    }

    pub fn primary_key<S: AsRef<str>>(&mut self, name: Option<&str>, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.start_new_line();
        self.query_builder.sql.push_str("    ");
        self.push_constraint_name(name);
        let columns = self.quote_columns(columns);
        self.query_builder.sql.push_str(&format!("primary key ({})", columns));

        self
    }

    /// An index declared inside the table, for engines that allow it.
    pub fn index(&mut self, name: &str, index: &Index) -> &mut Self {
        self.start_new_line();
        let dialect = self.query_builder.dialect;
        self.query_builder.sql.push_str(&format!(
            "    {}index {} ({})",
            if index.unique { "unique " } else { "" },
            dialect.quote(name),
            index_columns(dialect, index)
        ));

        self
    }

    pub fn check_constraint(&mut self, name: Option<&str>, expression: &str) -> &mut Self {
        self.start_new_line();
        self.query_builder.sql.push_str("    ");
        self.push_constraint_name(name);
        self.query_builder.sql.push_str(&format!("check ({})", expression));

        self
    }

    fn push_constraint_name(&mut self, name: Option<&str>) {
        if let Some(name) = name {
            let name = self.query_builder.dialect.quote(name);
            self.query_builder.sql.push_str(&format!("constraint {} ", name));
        }
    }

    fn quote_columns<S: AsRef<str>>(&self, columns: impl IntoIterator<Item = S>) -> String {
        columns
            .into_iter()
            .map(|c| self.query_builder.dialect.quote_column(c.as_ref()))
            .join(", ")
    }

    fn start_new_line(&mut self) {
        if self.has_first_line {
            self.query_builder.sql.push_str(",\n")
        } else {
            self.query_builder.sql.push('\n');
            self.has_first_line = true;
        }
    }
}

pub struct DdlTableColumnBuilder<'a> {
    sql: &'a mut String,
}

impl<'a> DdlTableColumnBuilder<'a> {
    pub fn not_null(&mut self) -> &mut Self {
        self.sql.push_str(" not null");

        self
    }

    pub fn default_value(&mut self, expression: &str) -> &mut Self {
        self.sql.push_str(" default ");
        self.sql.push_str(expression);

        self
    }

    pub fn identity(&mut self, clause: &str) -> &mut Self {
        self.sql.push(' ');
        self.sql.push_str(clause);

        self
    }

    pub fn check(&mut self, expression: &str) -> &mut Self {
        self.sql.push_str(" check (");
        self.sql.push_str(expression);
        self.sql.push(')');

        self
    }
}

fn index_columns(dialect: &dyn Dialect, index: &Index) -> String {
    index
        .columns
        .iter()
        .map(|c| {
            let name = dialect.quote_column(c.name.value());
            if c.descending {
                format!("{} desc", name)
            } else {
                name
            }
        })
        .join(", ")
}

fn quote_all(dialect: &dyn Dialect, columns: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    columns.into_iter().map(|c| dialect.quote_column(c.as_ref())).join(", ")
}

pub fn create_index(dialect: &dyn Dialect, table: &TableRef, name: &str, index: &Index) -> String {
    let mut sql = format!(
        "create {}index {} on {} ({})",
        if index.unique { "unique " } else { "" },
        dialect.quote(name),
        dialect.qualify(table),
        index_columns(dialect, index)
    );

    if let Some(predicate) = &index.predicate {
        sql.push_str(" where ");
        sql.push_str(predicate);
    }

    sql
}

pub fn add_foreign_key(dialect: &dyn Dialect, name: &str, foreign_key: &ForeignKey) -> String {
    let mut sql = format!(
        "alter table {} add constraint {} foreign key ({}) references {} ({})",
        dialect.qualify(&foreign_key.foreign_table),
        dialect.quote(name),
        quote_all(dialect, foreign_key.columns.iter().map(|c| c.foreign_column.value())),
        dialect.qualify(&foreign_key.primary_table),
        quote_all(dialect, foreign_key.columns.iter().map(|c| c.primary_column.value())),
    );

    if foreign_key.update_action != ReferenceAction::NoAction {
        sql.push_str(" on update ");
        sql.push_str(foreign_key.update_action.as_sql());
    }
    if foreign_key.delete_action != ReferenceAction::NoAction {
        sql.push_str(" on delete ");
        sql.push_str(foreign_key.delete_action.as_sql());
    }

    sql
}

pub fn create_sequence(dialect: &dyn Dialect, catalog: Option<&Identifier>, schema: Option<&Identifier>, name: &str, sequence: &Sequence) -> String {
    let mut sql = format!(
        "create sequence {} start with {} increment by {}",
        dialect.qualify_name(catalog, schema, name),
        sequence.last_value.map(|v| v + sequence.increment_by).unwrap_or(sequence.start_with),
        sequence.increment_by
    );

    if let Some(min) = sequence.min_value {
        sql.push_str(&format!(" minvalue {}", min));
    }
    if let Some(max) = sequence.max_value {
        sql.push_str(&format!(" maxvalue {}", max));
    }
    if let Some(cache) = sequence.cache {
        sql.push_str(&format!(" cache {}", cache));
    }
    if sequence.cycle {
        sql.push_str(" cycle");
    }

    sql
}

pub fn drop_sequence(dialect: &dyn Dialect, catalog: Option<&Identifier>, schema: Option<&Identifier>, name: &str) -> String {
    format!("drop sequence {}{}", dialect.if_exists(), dialect.qualify_name(catalog, schema, name))
}

pub fn drop_table(dialect: &dyn Dialect, table: &TableRef) -> String {
    format!("drop table {}{}", dialect.if_exists(), dialect.qualify(table))
}

pub fn create_trigger(dialect: &dyn Dialect, name: &str, trigger: &Trigger) -> String {
    let mut event = trigger.event.as_sql().to_string();
    if let (TriggerType::ColumnTrigger, Some(column)) = (trigger.trigger_type, &trigger.column) {
        event.push_str(" of ");
        event.push_str(&dialect.quote_column(column.value()));
    }

    format!(
        "create trigger {} {} {} on {} for each row {}",
        dialect.quote(name),
        trigger.timing.as_sql(),
        event,
        dialect.qualify(&trigger.table),
        trigger.body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use crate::dialect::{MySqlDialect, PostgresDialect};
    use crate::models::TriggerEvent;

    fn my_table() -> TableRef {
        TableRef::in_schema("public", "my_table")
    }

    #[test]
    fn builds_create_table_expression() {
        let dialect = PostgresDialect::new();
        let mut builder = DdlQueryBuilder::new(&dialect);
        let mut table_builder = builder.create_table(&my_table());
        table_builder.column("id", "int");
        table_builder.column("name", "varchar(255)");
        table_builder.primary_key(Some("pk_table"), vec!["id"]);
        let result = builder.build();

        assert_eq!(
            result,
            indoc! {r#"
        create table public.my_table (
            id int,
            name varchar(255),
            constraint pk_table primary key (id)
        )"#}
        );
    }

    #[test]
    fn unnamed_primary_key_over_multiple_columns() {
        let dialect = PostgresDialect::new();
        let mut builder = DdlQueryBuilder::new(&dialect);
        let mut table_builder = builder.create_table(&my_table());
        table_builder.column("id", "int");
        table_builder.column("name", "varchar(255)");
        table_builder.primary_key(None, vec!["id", "name"]);
        let result = builder.build();

        assert_eq!(
            result,
            indoc! {r#"
        create table public.my_table (
            id int,
            name varchar(255),
            primary key (id, name)
        )"#}
        );
    }

    #[test]
    fn column_modifiers() {
        let dialect = PostgresDialect::new();
        let mut builder = DdlQueryBuilder::new(&dialect);
        let mut table_builder = builder.create_table(&my_table());
        table_builder.column("id", "bigint").not_null().identity("generated by default as identity");
        table_builder.column("Status", "varchar(10)").not_null().default_value("'new'");
        table_builder.column("age", "int").check("age > 0");
        table_builder.check_constraint(Some("check_name"), "\"Status\" <> 'foo'");
        let result = builder.build();

        assert_eq!(
            result,
            indoc! {r#"
        create table public.my_table (
            id bigint not null generated by default as identity,
            "Status" varchar(10) not null default 'new',
            age int check (age > 0),
            constraint check_name check ("Status" <> 'foo')
        )"#}
        );
    }

    #[test]
    fn inline_indexes() {
        let dialect = MySqlDialect::new();
        let mut builder = DdlQueryBuilder::new(&dialect);
        let mut table_builder = builder.create_table(&TableRef::new("orders"));
        table_builder.column("id", "int").not_null();
        table_builder.column("order", "int");
        table_builder.index("idx_orders_order", &Index::new(["order"]).unique());
        let result = builder.build();

        assert_eq!(
            result,
            indoc! {r#"
        create table orders (
            id int not null,
            `order` int,
            unique index idx_orders_order (`order`)
        )"#}
        );
    }

    #[test]
    fn standalone_statements() {
        let dialect = PostgresDialect::new();
        let mut index = Index::new(["created_at"]);
        index.columns[0].descending = true;
        index.predicate = Some("deleted = false".to_string());

        assert_eq!(
            create_index(&dialect, &my_table(), "idx_created", &index),
            "create index idx_created on public.my_table (created_at desc) where deleted = false"
        );

        let fk = ForeignKey::new(TableRef::in_schema("public", "orders"), TableRef::in_schema("public", "customers"))
            .column("customer_id", "id")
            .on_delete(ReferenceAction::Cascade);
        assert_eq!(
            add_foreign_key(&dialect, "fk_orders", &fk),
            "alter table public.orders add constraint fk_orders foreign key (customer_id) references public.customers (id) on delete cascade"
        );

        let public = Identifier::new("public");
        let mut sequence = Sequence::new("order_ids");
        sequence.last_value = Some(41);
        sequence.cache = Some(10);
        assert_eq!(
            create_sequence(&dialect, None, Some(&public), "order_ids", &sequence),
            "create sequence public.order_ids start with 42 increment by 1 cache 10"
        );
        assert_eq!(drop_sequence(&dialect, None, Some(&public), "order_ids"), "drop sequence if exists public.order_ids");

        let trigger = Trigger {
            name: None,
            table: my_table(),
            trigger_type: TriggerType::ColumnTrigger,
            timing: Default::default(),
            event: TriggerEvent::Update,
            column: Some("name".into()),
            body: "execute function audit()".to_string(),
        };
        assert_eq!(
            create_trigger(&dialect, "trg_name", &trigger),
            "create trigger trg_name before update of name on public.my_table for each row execute function audit()"
        );
    }
}
