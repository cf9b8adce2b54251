use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::future::Future;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use super::{ClienteStore, StoreError};
use crate::models::{Cliente, ClienteCambios, Errores, FiltroBusqueda};
use crate::observability::{record_db_query, update_db_pool_stats};

const TABLE: &str = "clientes";

#[derive(Debug, FromRow)]
struct ClienteRow {
    id: Uuid,
    clave_cliente: String,
    nombre: String,
    celular: String,
    email: String,
    errores: Option<Json<Errores>>,
}

impl From<ClienteRow> for Cliente {
    fn from(row: ClienteRow) -> Self {
        Cliente {
            id: row.id,
            clave_cliente: row.clave_cliente,
            nombre: row.nombre,
            celular: row.celular,
            email: row.email,
            errores: row.errores.map(|Json(e)| e),
        }
    }
}

/// Postgres-backed store; `Errores` is kept as JSONB
#[derive(Clone)]
pub struct PgClienteStore {
    pool: PgPool,
}

impl PgClienteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `clientes` table if it does not exist
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS clientes (
                id UUID PRIMARY KEY,
                clave_cliente VARCHAR(3) NOT NULL UNIQUE,
                nombre TEXT NOT NULL,
                celular TEXT NOT NULL,
                email TEXT NOT NULL,
                errores JSONB
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        info!("✅ Table clientes ready");
        Ok(())
    }

    async fn timed<T, F>(&self, query_type: &str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        let start = Instant::now();
        let result = fut.await;
        record_db_query(query_type, TABLE, start.elapsed().as_secs_f64(), result.is_ok());
        update_db_pool_stats("main", self.pool.size(), self.pool.num_idle());
        result.map_err(|e| {
            error!(query_type, error = %e, "❌ Database query failed");
            StoreError::from(e)
        })
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filtro: &FiltroBusqueda) {
    builder.push(" WHERE TRUE");
    if let Some(nombre) = &filtro.nombre {
        builder.push(" AND nombre ILIKE ").push_bind(escape_like(nombre));
    }
    if let Some(email) = &filtro.email {
        builder.push(" AND email ILIKE ").push_bind(escape_like(email));
    }
    if let Some(celular) = &filtro.celular {
        builder.push(" AND celular = ").push_bind(celular.clone());
    }
}

#[async_trait]
impl ClienteStore for PgClienteStore {
    async fn find_by_clave(&self, clave: &str) -> Result<Option<Cliente>, StoreError> {
        let row = self
            .timed(
                "select",
                sqlx::query_as::<_, ClienteRow>(
                    "SELECT id, clave_cliente, nombre, celular, email, errores FROM clientes WHERE clave_cliente = $1",
                )
                .bind(clave)
                .fetch_optional(&self.pool),
            )
            .await?;
        Ok(row.map(Cliente::from))
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let total: i64 = self
            .timed("count", sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM clientes").fetch_one(&self.pool))
            .await?;
        Ok(total.max(0) as u64)
    }

    async fn find_page(&self, skip: u64, limit: u32) -> Result<Vec<Cliente>, StoreError> {
        let rows = self
            .timed(
                "select_page",
                sqlx::query_as::<_, ClienteRow>(
                    r#"
                    SELECT id, clave_cliente, nombre, celular, email, errores
                    FROM clientes
                    ORDER BY clave_cliente ASC
                    LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(i64::from(limit))
                .bind(skip as i64)
                .fetch_all(&self.pool),
            )
            .await?;
        Ok(rows.into_iter().map(Cliente::from).collect())
    }

    async fn insert(&self, cliente: &Cliente) -> Result<(), StoreError> {
        let result = self
            .timed(
                "insert",
                sqlx::query(
                    r#"
                    INSERT INTO clientes (id, clave_cliente, nombre, celular, email, errores)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    "#,
                )
                .bind(cliente.id)
                .bind(&cliente.clave_cliente)
                .bind(&cliente.nombre)
                .bind(&cliente.celular)
                .bind(&cliente.email)
                .bind(cliente.errores.as_ref().map(Json))
                .execute(&self.pool),
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(StoreError::Database(sqlx::Error::Database(db))) if db.is_unique_violation() => {
                Err(StoreError::Duplicate(cliente.clave_cliente.clone()))
            }
            Err(e) => Err(e),
        }
    }

    async fn update(
        &self,
        clave: &str,
        cambios: &ClienteCambios,
        errores: Option<&Errores>,
    ) -> Result<Option<Cliente>, StoreError> {
        let row = self
            .timed(
                "update",
                sqlx::query_as::<_, ClienteRow>(
                    r#"
                    UPDATE clientes
                    SET nombre = $2, celular = $3, email = $4, errores = $5
                    WHERE clave_cliente = $1
                    RETURNING id, clave_cliente, nombre, celular, email, errores
                    "#,
                )
                .bind(clave)
                .bind(&cambios.nombre)
                .bind(&cambios.celular)
                .bind(&cambios.email)
                .bind(errores.map(Json))
                .fetch_optional(&self.pool),
            )
            .await?;
        Ok(row.map(Cliente::from))
    }

    async fn delete(&self, clave: &str) -> Result<bool, StoreError> {
        let result = self
            .timed(
                "delete",
                sqlx::query("DELETE FROM clientes WHERE clave_cliente = $1")
                    .bind(clave)
                    .execute(&self.pool),
            )
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, filtro: &FiltroBusqueda, limit: u32) -> Result<(Vec<Cliente>, u64), StoreError> {
        let mut select = QueryBuilder::<Postgres>::new(
            "SELECT id, clave_cliente, nombre, celular, email, errores FROM clientes",
        );
        push_filters(&mut select, filtro);
        select.push(" ORDER BY clave_cliente ASC LIMIT ").push_bind(i64::from(limit));
        let rows = self
            .timed("search", select.build_query_as::<ClienteRow>().fetch_all(&self.pool))
            .await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM clientes");
        push_filters(&mut count, filtro);
        let total: i64 = self
            .timed("search_count", count.build_query_scalar::<i64>().fetch_one(&self.pool))
            .await?;

        Ok((rows.into_iter().map(Cliente::from).collect(), total.max(0) as u64))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.timed("ping", sqlx::query("SELECT 1").execute(&self.pool)).await?;
        Ok(())
    }
}
