use sqlx::{Encode, Postgres, QueryBuilder, Type};

/// Builds `UPDATE <table> SET ... WHERE id = $n` from the fields a patch carries.
/// Every value is bound; only column names are spliced into the SQL.
pub(crate) struct UpdateBuilder<'args> {
    qb: QueryBuilder<'args, Postgres>,
    fields: usize,
}

impl<'args> UpdateBuilder<'args> {
    pub(crate) fn new(table: &'static str) -> Self {
        Self {
            qb: QueryBuilder::new(format!("UPDATE {table} SET ")),
            fields: 0,
        }
    }

    pub(crate) fn set<T>(&mut self, column: &'static str, value: Option<T>) -> &mut Self
    where
        T: 'args + Encode<'args, Postgres> + Type<Postgres> + Send,
    {
        if let Some(value) = value {
            if self.fields > 0 {
                self.qb.push(", ");
            }
            self.qb.push(column);
            self.qb.push(" = ");
            self.qb.push_bind(value);
            self.fields += 1;
        }
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.fields == 0
    }

    pub(crate) fn finish(mut self, id: i64) -> QueryBuilder<'args, Postgres> {
        self.qb.push(" WHERE id = ");
        self.qb.push_bind(id);
        self.qb
    }
}
