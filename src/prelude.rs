pub use std::{sync::Arc, time::Duration};

pub use chrono::{NaiveDate, NaiveDateTime as DateTime, Utc};
pub use migration::{Migrator, MigratorTrait};
pub use sea_orm::{
  ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection,
  EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
pub use tracing::{debug, error, info, warn};

pub use crate::error::{Error, Result};
