//! Round trips against a live database. Skipped unless `DATABASE_URL` is set.

use pgcrud::{
    BuiltQuery, Crud, FieldMeta, NamedTable, OrmError, OrmResult, QueryOutcome, Relation,
    RetrieveParams, RowData, RowExt, TableRef, Value, qb,
};
use tokio_postgres::{Client, NoTls};

async fn connect(test: &str) -> OrmResult<Option<Client>> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping {test}");
            return Ok(None);
        }
    };
    let (client, connection) = tokio_postgres::connect(&database_url, NoTls)
        .await
        .map_err(OrmError::from_db_error)?;
    tokio::spawn(async move {
        let _ = connection.await;
    });
    Ok(Some(client))
}

async fn batch(client: &Client, sql: &str) -> OrmResult<()> {
    client.batch_execute(sql).await.map_err(OrmError::from_db_error)
}

fn articles() -> TableRef {
    TableRef::named(
        NamedTable::from_metadata(
            "pgcrud_articles",
            [
                ("id", FieldMeta::number().auto()),
                ("title", FieldMeta::text()),
                ("tags", FieldMeta::array()),
                ("deleted_at", FieldMeta::text()),
            ],
        )
        .use_timestamp(true)
        .use_returning(true),
    )
}

const ARTICLES_DDL: &str = "CREATE TEMP TABLE pgcrud_articles (
    id BIGSERIAL PRIMARY KEY,
    title TEXT NOT NULL UNIQUE,
    tags TEXT[] NOT NULL DEFAULT '{}',
    deleted_at TIMESTAMPTZ
)";

#[tokio::test]
async fn crud_roundtrip() -> OrmResult<()> {
    let Some(client) = connect("crud_roundtrip").await? else {
        return Ok(());
    };
    batch(&client, ARTICLES_DDL).await?;
    let crud = Crud::new(&articles());

    let created = crud
        .create(&client, RowData::new().with("title", "first").with("tags", vec!["a", "b"]))
        .await?
        .expect("insert returns the row");
    let id: i64 = created.try_get_column("id")?;
    let data = created.to_row_data()?;
    assert_eq!(data.get("title"), Some(&Value::from("first")));
    assert_eq!(data.get("tags"), Some(&Value::from(vec!["a", "b"])));
    assert_eq!(data.get("deleted_at"), Some(&Value::Null));

    let fetched = crud.retrieve(&client, id).await?.expect("row exists");
    assert_eq!(fetched.try_get_column::<String>("title")?, "first");

    let updated = crud
        .update(
            &client,
            RowData::new().with("id", id).with("title", "second"),
            &RetrieveParams::new().use_returning(true),
        )
        .await?
        .expect("returning row");
    assert_eq!(updated.try_get_column::<String>("title")?, "second");

    // Nothing to assign: read back by id.
    let unchanged = crud
        .update(&client, RowData::new().with("id", id), &RetrieveParams::new())
        .await?
        .expect("fallback read");
    assert_eq!(unchanged.try_get_column::<String>("title")?, "second");

    let err = crud
        .create(&client, RowData::new().with("title", "second"))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());

    crud.mark_deleted(&client, RowData::new().with("id", id), &RetrieveParams::new())
        .await?;
    assert!(crud.retrieve(&client, id).await?.is_none());
    assert!(
        crud.retrieve_all(&client, &RetrieveParams::new())
            .await?
            .is_empty()
    );

    crud.delete(&client, RowData::new().with("id", id), &RetrieveParams::new())
        .await?;
    let remaining = client
        .query_one("SELECT count(*) FROM pgcrud_articles", &[])
        .await
        .map_err(OrmError::from_db_error)?;
    assert_eq!(remaining.try_get_column::<i64>("count")?, 0);
    Ok(())
}

#[tokio::test]
async fn joined_select_reads_aliased_fields() -> OrmResult<()> {
    let Some(client) = connect("joined_select_reads_aliased_fields").await? else {
        return Ok(());
    };
    batch(
        &client,
        "CREATE TEMP TABLE pgcrud_users (id BIGINT PRIMARY KEY, name TEXT NOT NULL);
         CREATE TEMP TABLE pgcrud_posts (id BIGINT PRIMARY KEY, user_id BIGINT NOT NULL, title TEXT NOT NULL);
         INSERT INTO pgcrud_users VALUES (1, 'alice'), (2, 'bob');
         INSERT INTO pgcrud_posts VALUES (10, 1, 'hello'), (11, 2, 'world'), (12, 1, 'again');",
    )
    .await?;

    let users = TableRef::named(NamedTable::new("pgcrud_users", ["id", "name"]));
    let posts = TableRef::named(
        NamedTable::new("pgcrud_posts", ["id", "user_id", "title"])
            .relation(Relation::to_table("user_id", &users, "id")),
    );

    let query = qb::select(&posts, "p")
        .table(&users, "u")
        .where_eq(&users, "name", "alice")
        .order_by(&posts, "id", qb::SortDirection::Asc)
        .build();
    let rows = pgcrud::execute(&client, &query).await.into_rows()?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].try_get_field::<String>("P", "title")?, "hello");
    assert_eq!(rows[1].try_get_field::<String>("P", "title")?, "again");
    assert_eq!(rows[0].try_get_field::<String>("U", "name")?, "alice");
    Ok(())
}

#[tokio::test]
async fn outcomes_are_classified() -> OrmResult<()> {
    let Some(client) = connect("outcomes_are_classified").await? else {
        return Ok(());
    };
    batch(&client, "CREATE TEMP TABLE pgcrud_flags (name TEXT PRIMARY KEY)").await?;

    let insert = BuiltQuery::new("INSERT INTO pgcrud_flags(name) VALUES($1)", vec![Value::from("x")]);
    assert_eq!(pgcrud::execute(&client, &insert).await.affected(), 1);
    assert!(pgcrud::execute(&client, &insert).await.is_unique_violation());

    let none = BuiltQuery::new("DELETE FROM pgcrud_flags WHERE name=$1", vec![Value::from("y")]);
    assert!(pgcrud::execute(&client, &none).await.is_empty());

    let broken = BuiltQuery::new("SELECT * FROM pgcrud_missing_table", Vec::new());
    assert!(matches!(pgcrud::execute(&client, &broken).await, QueryOutcome::Other(_)));
    Ok(())
}

#[tokio::test]
async fn transaction_rolls_back_on_error() -> OrmResult<()> {
    let Some(mut client) = connect("transaction_rolls_back_on_error").await? else {
        return Ok(());
    };
    batch(&client, ARTICLES_DDL).await?;
    let crud = Crud::new(&articles());

    let result: OrmResult<()> = pgcrud::transaction!(&mut client, tx, {
        crud.create(&tx, RowData::new().with("title", "doomed")).await?;
        Err::<(), OrmError>(OrmError::Other("abort".to_string()))
    });
    assert!(matches!(result, Err(OrmError::Other(_))));

    let committed: OrmResult<()> = pgcrud::transaction!(&mut client, tx, {
        crud.create(&tx, RowData::new().with("title", "kept")).await?;
        Ok::<(), OrmError>(())
    });
    committed?;

    let titles: Vec<String> = crud
        .retrieve_all(&client, &RetrieveParams::new())
        .await?
        .iter()
        .map(|row| row.try_get_column("title"))
        .collect::<OrmResult<_>>()?;
    assert_eq!(titles, vec!["kept".to_string()]);
    Ok(())
}

#[cfg(feature = "pool")]
#[tokio::test]
async fn executor_context_lifecycle() -> OrmResult<()> {
    dotenvy::dotenv().ok();
    if std::env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL is not set; skipping executor_context_lifecycle");
        return Ok(());
    }

    let ctx = pgcrud::ExecutorContext::init(pgcrud::ExecutorConfig::from_env()?.max_pool_size(2))?;
    let query = BuiltQuery::new("SELECT $1::BIGINT AS one", vec![Value::Int(1)]);
    let row = ctx.run_pooled(&query).await.into_first()?.expect("one row");
    assert_eq!(row.try_get_column::<i64>("one")?, 1);

    ctx.shutdown();
    assert!(ctx.is_closed());
    assert!(matches!(ctx.run_pooled(&query).await, QueryOutcome::Other(_)));
    Ok(())
}
