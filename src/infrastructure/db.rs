use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Equipment lines: one row per homogeneous pool of physical units
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS equipment (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            inventory_number TEXT NOT NULL UNIQUE,
            category_id INTEGER,
            total_stock INTEGER NOT NULL DEFAULT 0,
            daily_rate REAL NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'available',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Rental line items
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS rentals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            order_id INTEGER NOT NULL,
            equipment_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL,
            issue_date TEXT NOT NULL,
            planned_return_date TEXT NOT NULL,
            daily_rate REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'created',
            batch_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (equipment_id) REFERENCES equipment(id) ON DELETE CASCADE
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Return events, append-only
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS return_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            rental_id INTEGER NOT NULL,
            return_quantity INTEGER NOT NULL,
            actual_return_date TEXT NOT NULL,
            condition TEXT NOT NULL DEFAULT 'ok',
            damage_description TEXT,
            additional_charges REAL NOT NULL DEFAULT 0,
            batch_id TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (rental_id) REFERENCES rentals(id) ON DELETE CASCADE
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Sale/write-off claims
    db.execute(Statement::from_string(
        db.get_database_backend(),
        r#"
        CREATE TABLE IF NOT EXISTS stock_allocations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            equipment_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            quantity INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (equipment_id) REFERENCES equipment(id) ON DELETE CASCADE
        )
        "#
        .to_owned(),
    ))
    .await?;

    // Indexes for the availability computation and batch lookups
    for stmt in [
        "CREATE INDEX IF NOT EXISTS idx_rentals_equipment ON rentals(equipment_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_rentals_batch ON rentals(batch_id)",
        "CREATE INDEX IF NOT EXISTS idx_returns_rental ON return_records(rental_id)",
        "CREATE INDEX IF NOT EXISTS idx_returns_batch ON return_records(batch_id)",
        "CREATE INDEX IF NOT EXISTS idx_allocations_equipment ON stock_allocations(equipment_id, status)",
    ] {
        db.execute(Statement::from_string(
            db.get_database_backend(),
            stmt.to_owned(),
        ))
        .await?;
    }

    Ok(())
}
