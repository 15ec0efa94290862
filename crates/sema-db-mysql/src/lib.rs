// # MySQL Inventory Store
//
// Inserts one row describing the device into the central `box` table on the
// site's MariaDB server.
//
// - ✅ One connection per register call, opened and closed inside
//   `record_device` (success and error paths both release it)
// - ✅ One parameterized INSERT, autocommitted
// - ✅ Duplicate UID reported as `AlreadyProvisioned` (unique key on
//   `sema_id`), everything else as a fatal inventory error
// - ❌ NO pooling, NO retry: the provisioning sequence is single-shot
//
// ## Schema
//
// ```sql
// CREATE TABLE box (
//     sema_id       VARCHAR(64)  NOT NULL PRIMARY KEY,
//     sema_hostname VARCHAR(255) NOT NULL,
//     sema_ip       VARCHAR(45)  NOT NULL,
//     sema_dns      VARCHAR(255) NOT NULL,
//     sema_version  VARCHAR(32)  NOT NULL
// );
// ```

use async_trait::async_trait;
use sema_core::config::DatabaseConfig;
use sema_core::device::DeviceRecord;
use sema_core::error::{Error, Result};
use sema_core::traits::{InventoryStore, InventoryStoreFactory};
use sqlx::Connection;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};

/// INSERT against the fixed inventory schema; column order is part of the
/// contract with the central database
const INSERT_DEVICE_SQL: &str =
    "INSERT INTO box (sema_id, sema_hostname, sema_ip, sema_dns, sema_version) \
     VALUES (?, ?, ?, ?, ?)";

/// Inventory store backed by a MySQL/MariaDB server
pub struct MysqlInventory {
    options: MySqlConnectOptions,
}

impl MysqlInventory {
    /// Create a new store from connection parameters
    pub fn new(config: &DatabaseConfig) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);

        Self { options }
    }
}

/// The five persisted values, in INSERT column order
fn insert_values(record: &DeviceRecord) -> [String; 5] {
    [
        record.uid.clone(),
        record.hostname.clone(),
        record.local_ip.to_string(),
        record.dns_name.clone(),
        record.version.clone(),
    ]
}

/// Map an insert failure to the provisioning error taxonomy
fn map_insert_error(uid: &str, e: sqlx::Error) -> Error {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return Error::already_provisioned(uid);
        }
    }
    Error::inventory(format!("failed to insert device row: {}", e))
}

#[async_trait]
impl InventoryStore for MysqlInventory {
    async fn record_device(&self, record: &DeviceRecord) -> Result<()> {
        let mut conn = MySqlConnection::connect_with(&self.options)
            .await
            .map_err(|e| Error::inventory(format!("failed to connect to database: {}", e)))?;

        let [uid, hostname, ip, dns, version] = insert_values(record);
        let result = sqlx::query(INSERT_DEVICE_SQL)
            .bind(uid)
            .bind(hostname)
            .bind(ip)
            .bind(dns)
            .bind(version)
            .execute(&mut conn)
            .await;

        // the connection is released whether or not the insert succeeded
        let close_result = conn.close().await;

        let done = result.map_err(|e| map_insert_error(&record.uid, e))?;
        tracing::debug!(
            "Recorded device {} in inventory ({} row)",
            record.uid,
            done.rows_affected()
        );

        close_result
            .map_err(|e| Error::inventory(format!("failed to close database connection: {}", e)))?;

        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "mysql"
    }
}

/// Factory for creating MySQL inventory stores
pub struct MysqlFactory;

impl InventoryStoreFactory for MysqlFactory {
    fn create(&self, config: &DatabaseConfig) -> Result<Box<dyn InventoryStore>> {
        config.validate()?;
        Ok(Box::new(MysqlInventory::new(config)))
    }
}

/// Register the MySQL store with a registry
pub fn register(registry: &sema_core::Registry) {
    registry.register_store("mysql", Box::new(MysqlFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DeviceRecord {
        DeviceRecord {
            uid: "abc123".to_string(),
            hostname: "sema01".to_string(),
            local_ip: "192.168.1.10".parse().unwrap(),
            public_ip: "203.0.113.7".parse().unwrap(),
            dns_name: "sema01.cma4.box".to_string(),
            version: "1.2.5".to_string(),
        }
    }

    #[test]
    fn insert_binds_the_five_values_in_column_order() {
        let values = insert_values(&record());
        assert_eq!(
            values,
            [
                "abc123".to_string(),
                "sema01".to_string(),
                "192.168.1.10".to_string(),
                "sema01.cma4.box".to_string(),
                "1.2.5".to_string(),
            ]
        );
    }

    #[test]
    fn statement_lists_columns_in_documented_order() {
        let columns = ["sema_id", "sema_hostname", "sema_ip", "sema_dns", "sema_version"];

        let mut last = 0;
        for column in columns {
            let pos = INSERT_DEVICE_SQL
                .find(column)
                .unwrap_or_else(|| panic!("column {} missing from statement", column));
            assert!(pos > last, "column {} out of order", column);
            last = pos;
        }

        assert_eq!(INSERT_DEVICE_SQL.matches('?').count(), 5);
    }

    #[test]
    fn public_ip_is_not_persisted() {
        // the table has five columns; the public address is carried for
        // reporting only
        let values = insert_values(&record());
        assert!(!values.contains(&"203.0.113.7".to_string()));
    }

    #[test]
    fn non_database_errors_map_to_inventory() {
        let err = map_insert_error("abc123", sqlx::Error::RowNotFound);
        assert!(matches!(err, Error::Inventory(_)));
    }

    #[test]
    fn factory_rejects_empty_credentials() {
        let factory = MysqlFactory;

        let config = DatabaseConfig {
            host: "192.168.150.240".to_string(),
            port: 3306,
            user: "semabox".to_string(),
            password: String::new(),
            database: "semabox".to_string(),
            backend: "mysql".to_string(),
        };

        assert!(factory.create(&config).is_err());
    }
}
