use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, Set};

use stockyard::db;
use stockyard::domain::StockError;
use stockyard::models::rental::{RentalDto, RentalItemDto};
use stockyard::models::return_record::ReturnDto;
use stockyard::models::{equipment, rental, return_record};
use stockyard::services::allocation_service::LineLocks;
use stockyard::services::batch_service::{self, BatchItems};
use stockyard::services::{ledger_service, rental_service};

// Helper to create a test database
async fn setup_test_db() -> DatabaseConnection {
    // In-memory SQLite for testing
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

// Helper to create a test equipment line
async fn create_test_equipment(
    db: &DatabaseConnection,
    name: &str,
    inventory_number: &str,
    total_stock: i32,
) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let line = equipment::ActiveModel {
        name: Set(name.to_string()),
        inventory_number: Set(inventory_number.to_string()),
        category_id: Set(None),
        total_stock: Set(total_stock),
        daily_rate: Set(25.0),
        status: Set("available".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    let res = line.insert(db).await.expect("Failed to create equipment");
    res.id
}

fn rental_dto(equipment_id: i32, quantity: i32) -> RentalDto {
    RentalDto {
        order_id: 1,
        equipment_id,
        quantity,
        issue_date: "2026-03-01".to_string(),
        planned_return_date: "2026-03-15".to_string(),
        daily_rate: None,
        status: None,
        batch_id: None,
    }
}

fn ok_return(quantity: i32) -> ReturnDto {
    ReturnDto {
        return_quantity: quantity,
        actual_return_date: Some("2026-03-10".to_string()),
        condition: "ok".to_string(),
        damage_description: None,
        additional_charges: None,
        batch_id: None,
    }
}

async fn availability(db: &DatabaseConnection, equipment_id: i32) -> i32 {
    ledger_service::available_stock(db, equipment_id)
        .await
        .expect("availability failed")
        .available_stock
}

#[tokio::test]
async fn test_full_lifecycle_scenario() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();
    let excavator = create_test_equipment(&db, "Mini excavator", "EXC-001", 10).await;

    // No outstanding allocations
    assert_eq!(availability(&db, excavator).await, 10);

    // Order A claims 7 units
    let rental = rental_service::create_rental(&db, &locks, rental_dto(excavator, 7))
        .await
        .expect("claim of 7 should succeed");
    assert_eq!(rental.status, "issued");
    assert_eq!(availability(&db, excavator).await, 3);

    // Order B wants 5: only 3 left, must report the exact shortfall
    let err = rental_service::create_rental(&db, &locks, rental_dto(excavator, 5))
        .await
        .expect_err("claim of 5 must fail");
    assert!(matches!(
        err,
        StockError::InsufficientStock {
            requested: 5,
            available: 3,
            ..
        }
    ));

    // Partial return of 4: availability back to 7, rental still issued
    rental_service::return_rental(&db, &locks, rental.id, ok_return(4))
        .await
        .expect("partial return should succeed");
    assert_eq!(availability(&db, excavator).await, 7);

    let after_partial = rental::Entity::find_by_id(rental.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after_partial.status, "issued");
    assert_eq!(
        ledger_service::rental_outstanding(&db, &after_partial)
            .await
            .unwrap(),
        3
    );

    // Final return of the remaining 3 closes the rental
    rental_service::return_rental(&db, &locks, rental.id, ok_return(3))
        .await
        .expect("final return should succeed");
    assert_eq!(availability(&db, excavator).await, 10);

    let closed = rental::Entity::find_by_id(rental.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(closed.status, "returned");
}

#[tokio::test]
async fn test_boundary_claims() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();
    let line = create_test_equipment(&db, "Scaffolding set", "SCF-001", 4).await;

    // available + 1 always fails
    let err = rental_service::create_rental(&db, &locks, rental_dto(line, 5))
        .await
        .expect_err("claim above availability must fail");
    assert!(matches!(
        err,
        StockError::InsufficientStock {
            requested: 5,
            available: 4,
            ..
        }
    ));

    // exactly available succeeds and leaves zero
    rental_service::create_rental(&db, &locks, rental_dto(line, 4))
        .await
        .expect("claim of the whole pool should succeed");
    assert_eq!(availability(&db, line).await, 0);

    // the next single unit is refused
    let err = rental_service::create_rental(&db, &locks, rental_dto(line, 1))
        .await
        .expect_err("claim against empty pool must fail");
    assert!(matches!(
        err,
        StockError::InsufficientStock {
            requested: 1,
            available: 0,
            ..
        }
    ));
}

#[tokio::test]
async fn test_claim_release_round_trip() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();
    let line = create_test_equipment(&db, "Concrete mixer", "MIX-001", 6).await;

    let rental = rental_service::create_rental(&db, &locks, rental_dto(line, 6))
        .await
        .unwrap();
    assert_eq!(availability(&db, line).await, 0);

    rental_service::return_rental(&db, &locks, rental.id, ok_return(6))
        .await
        .unwrap();
    assert_eq!(availability(&db, line).await, 6);
}

#[tokio::test]
async fn test_double_return_is_over_release() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();
    let line = create_test_equipment(&db, "Jackhammer", "JCK-001", 5).await;

    let rental = rental_service::create_rental(&db, &locks, rental_dto(line, 3))
        .await
        .unwrap();

    rental_service::return_rental(&db, &locks, rental.id, ok_return(3))
        .await
        .expect("first full return succeeds");

    // The identical second call must never double-decrement
    let err = rental_service::return_rental(&db, &locks, rental.id, ok_return(3))
        .await
        .expect_err("second return must fail");
    assert!(matches!(
        err,
        StockError::OverRelease {
            outstanding: 0,
            requested: 3,
            ..
        }
    ));
    assert_eq!(availability(&db, line).await, 5);
}

#[tokio::test]
async fn test_invalid_date_range_persists_nothing() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();
    let line = create_test_equipment(&db, "Generator", "GEN-001", 3).await;

    let mut dto = rental_dto(line, 1);
    dto.planned_return_date = "2026-03-01".to_string(); // == issue_date

    let err = rental_service::create_rental(&db, &locks, dto)
        .await
        .expect_err("planned <= issue must fail");
    assert!(matches!(err, StockError::InvalidDateRange { .. }));

    let count = rental::Entity::find().count(&db).await.unwrap();
    assert_eq!(count, 0);
    assert_eq!(availability(&db, line).await, 3);
}

#[tokio::test]
async fn test_damaged_return_requires_description() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();
    let line = create_test_equipment(&db, "Angle grinder", "GRD-001", 2).await;

    let rental = rental_service::create_rental(&db, &locks, rental_dto(line, 2))
        .await
        .unwrap();

    let dto = ReturnDto {
        return_quantity: 1,
        actual_return_date: None,
        condition: "damaged".to_string(),
        damage_description: Some("   ".to_string()),
        additional_charges: None,
        batch_id: None,
    };

    let err = rental_service::return_rental(&db, &locks, rental.id, dto)
        .await
        .expect_err("damaged return without description must fail");
    assert!(matches!(err, StockError::MissingDamageDescription));

    // Nothing persisted, availability unchanged
    let count = return_record::Entity::find().count(&db).await.unwrap();
    assert_eq!(count, 0);
    assert_eq!(availability(&db, line).await, 0);

    // With a description it goes through and records the charges
    let dto = ReturnDto {
        return_quantity: 1,
        actual_return_date: None,
        condition: "damaged".to_string(),
        damage_description: Some("bent guard plate".to_string()),
        additional_charges: Some(40.0),
        batch_id: None,
    };
    let record = rental_service::return_rental(&db, &locks, rental.id, dto)
        .await
        .expect("damaged return with description succeeds");
    assert_eq!(record.condition, "damaged");
    assert_eq!(record.additional_charges, 40.0);
    assert_eq!(availability(&db, line).await, 1);
}

#[tokio::test]
async fn test_retired_line_rejects_claims() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();
    let line = create_test_equipment(&db, "Old crane", "CRN-001", 8).await;

    stockyard::services::equipment_service::set_status(&db, line, "retired")
        .await
        .unwrap();

    let err = rental_service::create_rental(&db, &locks, rental_dto(line, 1))
        .await
        .expect_err("retired line must reject claims");
    assert!(matches!(err, StockError::InvalidEquipmentState { .. }));
}

#[tokio::test]
async fn test_invalid_quantities() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();
    let line = create_test_equipment(&db, "Compactor", "CMP-001", 5).await;

    let err = rental_service::create_rental(&db, &locks, rental_dto(line, 0))
        .await
        .expect_err("zero quantity must fail");
    assert!(matches!(err, StockError::InvalidQuantity { requested: 0 }));

    let rental = rental_service::create_rental(&db, &locks, rental_dto(line, 2))
        .await
        .unwrap();
    let err = rental_service::return_rental(&db, &locks, rental.id, ok_return(0))
        .await
        .expect_err("zero return quantity must fail");
    assert!(matches!(err, StockError::InvalidQuantity { requested: 0 }));
}

#[tokio::test]
async fn test_unknown_equipment_and_rental() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();

    let err = ledger_service::available_stock(&db, 999)
        .await
        .expect_err("unknown equipment must be NotFound");
    assert!(matches!(err, StockError::NotFound { entity: "equipment", .. }));

    let err = rental_service::return_rental(&db, &locks, 999, ok_return(1))
        .await
        .expect_err("unknown rental must be NotFound");
    assert!(matches!(err, StockError::NotFound { entity: "rental", .. }));
}

#[tokio::test]
async fn test_created_to_issued_transition() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();
    let line = create_test_equipment(&db, "Ladder", "LDR-001", 3).await;

    let mut dto = rental_dto(line, 2);
    dto.status = Some("created".to_string());
    let rental = rental_service::create_rental(&db, &locks, dto).await.unwrap();
    assert_eq!(rental.status, "created");

    // 'created' already counts against availability
    assert_eq!(availability(&db, line).await, 1);

    let issued = rental_service::issue_rental(&db, rental.id).await.unwrap();
    assert_eq!(issued.status, "issued");
    assert_eq!(availability(&db, line).await, 1);

    // Issuing twice is an invalid transition
    let err = rental_service::issue_rental(&db, rental.id)
        .await
        .expect_err("re-issuing must fail");
    assert!(matches!(err, StockError::Validation(_)));
}

#[tokio::test]
async fn test_daily_rate_snapshot_is_immutable() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();
    let line = create_test_equipment(&db, "Forklift", "FRK-001", 2).await;

    let rental = rental_service::create_rental(&db, &locks, rental_dto(line, 1))
        .await
        .unwrap();
    assert_eq!(rental.daily_rate, 25.0);

    // Catalog price change after issue must not touch the snapshot
    let model = equipment::Entity::find_by_id(line).one(&db).await.unwrap().unwrap();
    let mut active: equipment::ActiveModel = model.into();
    active.daily_rate = Set(99.0);
    active.update(&db).await.unwrap();

    let unchanged = rental::Entity::find_by_id(rental.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.daily_rate, 25.0);
}

#[tokio::test]
async fn test_batch_issuance_grouping_and_order() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();
    let excavator = create_test_equipment(&db, "Excavator", "EXC-010", 5).await;
    let mixer = create_test_equipment(&db, "Mixer", "MIX-010", 5).await;

    let items = vec![
        RentalItemDto {
            equipment_id: excavator,
            quantity: 2,
            issue_date: "2026-03-01".to_string(),
            planned_return_date: "2026-03-20".to_string(),
            daily_rate: None,
        },
        RentalItemDto {
            equipment_id: mixer,
            quantity: 3,
            issue_date: "2026-03-01".to_string(),
            planned_return_date: "2026-03-20".to_string(),
            daily_rate: Some(12.5),
        },
        RentalItemDto {
            equipment_id: excavator,
            quantity: 1,
            issue_date: "2026-03-01".to_string(),
            planned_return_date: "2026-03-20".to_string(),
            daily_rate: None,
        },
    ];

    let (batch_id, rentals) = rental_service::create_rental_batch(&db, &locks, 42, items)
        .await
        .expect("batch should succeed");
    assert!(batch_id.starts_with("ISS-"));
    assert_eq!(rentals.len(), 3);
    assert!(rentals.iter().all(|r| r.batch_id.as_deref() == Some(batch_id.as_str())));

    // Both items on the same line count against it inside one batch
    assert_eq!(availability(&db, excavator).await, 2);
    assert_eq!(availability(&db, mixer).await, 2);

    // Retrieval returns the creation sequence
    let batch = batch_service::items_for_batch(&db, &batch_id).await.unwrap();
    match batch {
        BatchItems::Issues(items) => {
            let ids: Vec<i32> = items.iter().map(|r| r.id).collect();
            let mut sorted = ids.clone();
            sorted.sort_unstable();
            assert_eq!(ids, sorted);
            assert_eq!(items.len(), 3);
            assert_eq!(items[1].daily_rate, 12.5);
        }
        BatchItems::Returns(_) => panic!("expected issuance batch"),
    }
}

#[tokio::test]
async fn test_failing_batch_item_rolls_back_everything() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();
    let crane = create_test_equipment(&db, "Crane", "CRN-010", 5).await;
    let drill = create_test_equipment(&db, "Drill", "DRL-010", 1).await;

    let items = vec![
        RentalItemDto {
            equipment_id: crane,
            quantity: 4,
            issue_date: "2026-03-01".to_string(),
            planned_return_date: "2026-03-10".to_string(),
            daily_rate: None,
        },
        RentalItemDto {
            equipment_id: drill,
            quantity: 2, // only 1 available
            issue_date: "2026-03-01".to_string(),
            planned_return_date: "2026-03-10".to_string(),
            daily_rate: None,
        },
    ];

    let err = rental_service::create_rental_batch(&db, &locks, 7, items)
        .await
        .expect_err("batch with an unfillable line must fail");
    assert!(matches!(err, StockError::InsufficientStock { .. }));

    // No partial batch survives
    let count = rental::Entity::find().count(&db).await.unwrap();
    assert_eq!(count, 0);
    assert_eq!(availability(&db, crane).await, 5);
    assert_eq!(availability(&db, drill).await, 1);
}

#[tokio::test]
async fn test_return_batch_grouping() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();
    let line = create_test_equipment(&db, "Pump", "PMP-001", 10).await;

    let rental_a = rental_service::create_rental(&db, &locks, rental_dto(line, 4))
        .await
        .unwrap();
    let rental_b = rental_service::create_rental(&db, &locks, rental_dto(line, 3))
        .await
        .unwrap();

    let batch_id = batch_service::new_batch_id(batch_service::BatchKind::Return);
    assert!(batch_id.starts_with("RET-"));

    for (rental_id, qty) in [(rental_a.id, 4), (rental_b.id, 3)] {
        let mut dto = ok_return(qty);
        dto.batch_id = Some(batch_id.clone());
        rental_service::return_rental(&db, &locks, rental_id, dto)
            .await
            .unwrap();
    }

    let batch = batch_service::items_for_batch(&db, &batch_id).await.unwrap();
    match batch {
        BatchItems::Returns(records) => {
            assert_eq!(records.len(), 2);
            assert_eq!(records[0].rental_id, rental_a.id);
            assert_eq!(records[1].rental_id, rental_b.id);
        }
        BatchItems::Issues(_) => panic!("expected return batch"),
    }
}

#[tokio::test]
async fn test_unknown_batch_is_not_found() {
    let db = setup_test_db().await;

    let err = batch_service::items_for_batch(&db, "ISS-does-not-exist")
        .await
        .expect_err("unknown batch must fail");
    assert!(matches!(err, StockError::BatchNotFound { .. }));
}

#[tokio::test]
async fn test_batch_ids_are_unique() {
    let mut seen = std::collections::HashSet::new();
    for _ in 0..1000 {
        assert!(seen.insert(batch_service::new_batch_id(
            batch_service::BatchKind::Issue
        )));
    }
}

#[tokio::test]
async fn test_list_rentals_with_details() {
    let db = setup_test_db().await;
    let locks = LineLocks::new();
    let line = create_test_equipment(&db, "Telehandler", "TLH-001", 8).await;

    let rental = rental_service::create_rental(&db, &locks, rental_dto(line, 5))
        .await
        .unwrap();
    rental_service::return_rental(&db, &locks, rental.id, ok_return(2))
        .await
        .unwrap();

    let listed = rental_service::list_rentals(
        &db,
        rental_service::RentalFilter {
            order_id: Some(1),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].equipment_name, "Telehandler");
    assert_eq!(listed[0].inventory_number, "TLH-001");
    assert_eq!(listed[0].quantity, 5);
    assert_eq!(listed[0].outstanding_quantity, 3);
    assert_eq!(listed[0].status, "issued");
}
