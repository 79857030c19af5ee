use std::collections::BTreeMap;

use parcel_game::{
    ContainerId, ContainerKind, CushionType, CustomerId, DeliveryError, EventKind, ItemCatalog,
    LidSide, PackingError, PackingStep, ParcelSession, PhysicalMode, SessionConfig, SessionError,
    StartingStock, TapeColor,
};

fn stocked_config() -> SessionConfig {
    SessionConfig {
        starting_stock: StartingStock {
            bank: 200,
            cash: 0,
            containers: BTreeMap::from([
                (ContainerKind::Small, 3),
                (ContainerKind::Medium, 3),
                (ContainerKind::Cold, 1),
            ]),
            cushion_packs: BTreeMap::from([
                (CushionType::Basic, 3),
                (CushionType::Strong, 1),
                (CushionType::Ice, 1),
            ]),
            tape_rolls: BTreeMap::from([(TapeColor::Blue, 1), (TapeColor::Red, 1)]),
        },
        ..SessionConfig::default()
    }
}

fn session_with(config: SessionConfig) -> ParcelSession {
    ParcelSession::new(config, ItemCatalog::builtin().unwrap()).unwrap()
}

fn pack_to_taped(
    session: &mut ParcelSession,
    customer: u32,
    key: &str,
    kind: ContainerKind,
) -> ContainerId {
    let item = session.accept_order(CustomerId(customer), key).unwrap();
    let id = session.spawn_container(kind).unwrap();
    session.insert_item(id, item).unwrap();
    for _ in 0..3 {
        session.apply_cushion(id, CushionType::Basic).unwrap();
    }
    session.close_lids(id).unwrap();
    session.apply_tape(id, TapeColor::Blue).unwrap();
    id
}

#[test]
fn happy_path_labels_and_registers() {
    let mut session = session_with(stocked_config());
    let id = pack_to_taped(&mut session, 7, "olive_oil", ContainerKind::Medium);
    session.attach_label(id).unwrap();

    let container = session.container(id).unwrap();
    assert_eq!(container.step(), PackingStep::Labeled);
    assert_eq!(container.mode(), PhysicalMode::Pickable);
    assert!(container.loose_items_attached());
    assert_eq!(container.tape_color(), Some(TapeColor::Blue));
    assert_eq!(container.damage_divisor(), 4);

    let record = session.deliveries().record(id).unwrap();
    assert_eq!(record.destination, "hillside_kitchen");
    assert_eq!(record.item_key, "olive_oil");
    assert_eq!(record.day_created, 1);
    assert_eq!(record.customer, Some(CustomerId(7)));

    let stock = session.stock();
    assert_eq!(stock.container_stock(ContainerKind::Medium), 2);
    assert_eq!(stock.cushion_uses(CushionType::Basic), 6);
    assert_eq!(stock.tape_uses(TapeColor::Blue), 9);

    let kinds: Vec<&'static str> = session
        .drain_events()
        .iter()
        .map(|event| match event.kind {
            EventKind::OrderAccepted { .. } => "accepted",
            EventKind::ContainerSpawned { .. } => "spawned",
            EventKind::ItemPacked { .. } => "packed",
            EventKind::CushionApplied { .. } => "cushion",
            EventKind::ContainerClosed { .. } => "closed",
            EventKind::ContainerTaped { .. } => "taped",
            EventKind::ContainerLabeled { .. } => "labeled",
            EventKind::CustomerNotified { .. } => "notified",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        [
            "accepted", "spawned", "packed", "cushion", "cushion", "cushion", "closed", "taped",
            "labeled", "notified"
        ]
    );
}

#[test]
fn steps_cannot_be_skipped() {
    let mut session = session_with(stocked_config());
    let item = session
        .accept_order(CustomerId(1), "olive_oil")
        .unwrap();
    let id = session.spawn_container(ContainerKind::Medium).unwrap();

    assert!(matches!(
        session.apply_cushion(id, CushionType::Basic),
        Err(SessionError::Packing(PackingError::NoItem))
    ));
    session.insert_item(id, item).unwrap();
    assert!(matches!(
        session.apply_tape(id, TapeColor::Blue),
        Err(SessionError::Packing(PackingError::CushionIncomplete))
    ));
    assert!(matches!(
        session.set_lid(id, LidSide::Left, true),
        Err(SessionError::Packing(PackingError::CushionIncomplete))
    ));
    assert!(matches!(
        session.attach_label(id),
        Err(SessionError::Packing(PackingError::OutOfSequence { .. }))
    ));
    assert_eq!(session.stock().tape_uses(TapeColor::Blue), 10);
    assert_eq!(
        session.container(id).unwrap().step(),
        PackingStep::ItemInside
    );
}

#[test]
fn cushion_types_cannot_mix_and_ice_needs_cold() {
    let mut session = session_with(stocked_config());
    let item = session
        .accept_order(CustomerId(1), "wool_scarf")
        .unwrap();
    let id = session.spawn_container(ContainerKind::Small).unwrap();
    session.insert_item(id, item).unwrap();

    assert!(matches!(
        session.apply_cushion(id, CushionType::Ice),
        Err(SessionError::Packing(PackingError::CushionIncompatible { .. }))
    ));
    session.apply_cushion(id, CushionType::Basic).unwrap();
    assert!(matches!(
        session.apply_cushion(id, CushionType::Strong),
        Err(SessionError::Packing(PackingError::CushionMismatch { .. }))
    ));
    assert_eq!(session.stock().cushion_uses(CushionType::Strong), 3);
    assert_eq!(session.stock().cushion_uses(CushionType::Ice), 3);

    session.apply_cushion(id, CushionType::Basic).unwrap();
    assert_eq!(session.apply_cushion(id, CushionType::Basic).unwrap(), 3);
    assert!(matches!(
        session.apply_cushion(id, CushionType::Basic),
        Err(SessionError::Packing(PackingError::CushionFull))
    ));
    assert_eq!(session.stock().cushion_uses(CushionType::Basic), 6);
}

#[test]
fn items_come_out_only_before_cushioning() {
    let mut session = session_with(stocked_config());
    let item = session
        .accept_order(CustomerId(3), "wool_scarf")
        .unwrap();
    let id = session.spawn_container(ContainerKind::Small).unwrap();
    session.insert_item(id, item).unwrap();

    let back = session.remove_item(id).unwrap();
    assert!(session.loose_item(back).is_some());
    assert_eq!(session.container(id).unwrap().step(), PackingStep::Empty);

    session.insert_item(id, back).unwrap();
    session.apply_cushion(id, CushionType::Basic).unwrap();
    assert!(matches!(
        session.remove_item(id),
        Err(SessionError::Packing(PackingError::CushionStarted))
    ));
}

#[test]
fn sealed_lids_stay_shut() {
    let mut session = session_with(stocked_config());
    let id = pack_to_taped(&mut session, 2, "wool_scarf", ContainerKind::Small);
    assert!(matches!(
        session.set_lid(id, LidSide::Right, false),
        Err(SessionError::Packing(PackingError::LidsSealed))
    ));
    assert_eq!(session.container(id).unwrap().lids_closed(), (true, true));
}

#[test]
fn full_delivery_ledger_leaves_box_taped() {
    let mut config = stocked_config();
    config.max_active_deliveries = 1;
    let mut session = session_with(config);

    let first = pack_to_taped(&mut session, 1, "wool_scarf", ContainerKind::Small);
    session.attach_label(first).unwrap();
    let second = pack_to_taped(&mut session, 2, "paperback", ContainerKind::Small);

    assert!(matches!(
        session.attach_label(second),
        Err(SessionError::Delivery(DeliveryError::CapacityFull { capacity: 1 }))
    ));
    assert_eq!(
        session.container(second).unwrap().step(),
        PackingStep::Taped
    );
    assert_eq!(session.deliveries().len(), 1);
}

#[test]
fn empty_stock_refuses_spawn() {
    let mut session = session_with(stocked_config());
    assert!(matches!(
        session.spawn_container(ContainerKind::Large),
        Err(SessionError::Stock(_))
    ));
    assert_eq!(session.containers().count(), 0);
}
