#![allow(dead_code)]

use diesel::connection::SimpleConnection;
use diesel::prelude::*;

/// Conexión en transacción de test con un schema propio (ver
/// `funnel-persistence/tests/test_support.rs`).
pub fn isolated_conn(schema: &str) -> Option<PgConnection> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(u) => u,
        Err(_) => {
            eprintln!("DATABASE_URL no definido: omitiendo test");
            return None;
        }
    };
    let mut conn = PgConnection::establish(&url).expect("connect");
    conn.begin_test_transaction().expect("test transaction");
    conn.batch_execute(&format!("CREATE SCHEMA {schema}; SET LOCAL search_path TO {schema};"))
        .expect("isolated schema");
    Some(conn)
}

pub fn output(buf: Vec<u8>) -> String {
    String::from_utf8(buf).expect("utf8")
}
