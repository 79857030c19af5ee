use std::collections::BTreeMap;

use parcel_game::{
    CarryError, ContainerId, ContainerKind, CushionType, CustomerId, EventKind, ItemCatalog,
    PackingStep, ParcelSession, PhysicalMode, SessionConfig, SessionError, StartingStock,
    TapeColor,
};

fn session(carry_slots: usize) -> ParcelSession {
    let config = SessionConfig {
        carry_slots,
        max_active_deliveries: 5,
        starting_stock: StartingStock {
            bank: 0,
            cash: 0,
            containers: BTreeMap::from([(ContainerKind::Medium, 5)]),
            cushion_packs: BTreeMap::from([(CushionType::Basic, 5)]),
            tape_rolls: BTreeMap::from([(TapeColor::Blue, 1)]),
        },
        ..SessionConfig::default()
    };
    ParcelSession::new(config, ItemCatalog::builtin().unwrap()).unwrap()
}

fn labeled(session: &mut ParcelSession, customer: u32, key: &str) -> ContainerId {
    let item = session.accept_order(CustomerId(customer), key).unwrap();
    let id = session.spawn_container(ContainerKind::Medium).unwrap();
    session.insert_item(id, item).unwrap();
    for _ in 0..3 {
        session.apply_cushion(id, CushionType::Basic).unwrap();
    }
    session.close_lids(id).unwrap();
    session.apply_tape(id, TapeColor::Blue).unwrap();
    session.attach_label(id).unwrap();
    id
}

fn taped(session: &mut ParcelSession, customer: u32, key: &str) -> ContainerId {
    let item = session.accept_order(CustomerId(customer), key).unwrap();
    let id = session.spawn_container(ContainerKind::Medium).unwrap();
    session.insert_item(id, item).unwrap();
    for _ in 0..3 {
        session.apply_cushion(id, CushionType::Basic).unwrap();
    }
    session.close_lids(id).unwrap();
    session.apply_tape(id, TapeColor::Blue).unwrap();
    id
}

#[test]
fn unlabeled_parcel_does_not_block_a_labeled_one() {
    let mut session = session(2);
    let unlabeled = taped(&mut session, 1, "paperback");
    let ready = labeled(&mut session, 2, "paperback");
    assert_eq!(session.store_container(unlabeled).unwrap(), 0);
    assert_eq!(session.store_container(ready).unwrap(), 1);

    let receipt = session.deliver_at("library_lane").unwrap();
    assert_eq!(receipt.container, ready);
    assert_eq!(receipt.customer, Some(CustomerId(2)));
    assert!(session.carry().slot(0).is_some());
    assert!(session.carry().slot(1).is_none());
    assert!(matches!(
        session.deliver_at("library_lane"),
        Err(SessionError::NothingForDestination { .. })
    ));
    assert!(session.carry().slot(0).is_some());
}

#[test]
fn declining_cancels_carried_deliveries() {
    let mut session = session(2);
    let carried = labeled(&mut session, 1, "paperback");
    let other = labeled(&mut session, 2, "olive_oil");
    session.store_container(carried).unwrap();
    assert_eq!(session.deliveries().len(), 2);

    assert_eq!(session.decline_order(CustomerId(1)), 0);
    assert_eq!(session.deliveries().len(), 1);
    assert!(session.deliveries().record(carried).is_none());
    assert!(session.deliveries().record(other).is_some());
    assert!(matches!(
        session.deliver_at("library_lane"),
        Err(SessionError::NothingForDestination { .. })
    ));
    assert_eq!(session.stock().cash_today(), 0);
}

#[test]
fn carried_parcels_deliver_at_their_destination() {
    let mut session = session(2);
    let oil = labeled(&mut session, 1, "olive_oil");
    let scarf = labeled(&mut session, 2, "wool_scarf");
    assert_eq!(session.store_container(oil).unwrap(), 0);
    assert_eq!(session.store_container(scarf).unwrap(), 1);
    assert!(session.container(oil).is_none());
    assert!(session.carry().is_full());

    let receipt = session.deliver_at("market_square").unwrap();
    assert_eq!(receipt.container, scarf);
    assert_eq!(receipt.customer, Some(CustomerId(2)));
    assert_eq!(receipt.reward, 25);
    assert!(session.carry().slot(1).is_none());
    assert_eq!(session.carry().free_slots(), 1);
    assert_eq!(session.deliveries().len(), 1);
    assert_eq!(session.stock().cash_today(), 25);
}

#[test]
fn unknown_destinations_deliver_nothing() {
    let mut session = session(1);
    let oil = labeled(&mut session, 1, "olive_oil");
    session.store_container(oil).unwrap();
    assert!(matches!(
        session.deliver_at("tech_park"),
        Err(SessionError::NothingForDestination { .. })
    ));
    assert!(matches!(
        session.deliver_at("  "),
        Err(SessionError::NothingForDestination { .. })
    ));
    assert!(session.carry().slot(0).is_some());
}

#[test]
fn full_carry_leaves_box_on_floor() {
    let mut session = session(1);
    let first = labeled(&mut session, 1, "olive_oil");
    let second = labeled(&mut session, 2, "paperback");
    session.store_container(first).unwrap();
    assert!(matches!(
        session.store_container(second),
        Err(SessionError::Carry(CarryError::NoFreeSlot { capacity: 1 }))
    ));
    let world = session.world_container(second).unwrap();
    assert_eq!(world.container.step(), PackingStep::Labeled);
    assert_eq!(world.owner, Some(CustomerId(2)));
}

#[test]
fn empty_boxes_cannot_be_carried() {
    let mut session = session(1);
    let id = session.spawn_container(ContainerKind::Medium).unwrap();
    assert!(matches!(
        session.store_container(id),
        Err(SessionError::Carry(CarryError::NoItem))
    ));
    assert!(session.container(id).is_some());
    assert_eq!(session.carry().free_slots(), 1);
}

#[test]
fn retrieved_boxes_resume_where_they_left_off() {
    let mut session = session(1);
    let id = labeled(&mut session, 4, "olive_oil");
    let slot = session.store_container(id).unwrap();
    session.drain_events();

    assert_eq!(session.retrieve_container(slot).unwrap(), id);
    let world = session.world_container(id).unwrap();
    assert_eq!(world.container.step(), PackingStep::Labeled);
    assert_eq!(world.container.mode(), PhysicalMode::Pickable);
    assert_eq!(world.container.cushion_count(), 3);
    assert_eq!(world.owner, Some(CustomerId(4)));
    assert!(session.carry().slot(slot).is_none());
    assert!(matches!(
        session.retrieve_container(slot),
        Err(SessionError::Carry(CarryError::EmptySlot { index: 0 }))
    ));
    assert!(matches!(
        session.retrieve_container(9),
        Err(SessionError::Carry(CarryError::InvalidSlot { index: 9 }))
    ));

    let events = session.drain_events();
    assert!(events.iter().any(|event| matches!(
        event.kind,
        EventKind::ParcelRetrieved { slot: 0, .. }
    )));
}

#[test]
fn carried_days_count_down() {
    let mut session = session(1);
    let id = labeled(&mut session, 1, "olive_oil");
    let slot = session.store_container(id).unwrap();
    assert_eq!(session.carry().slot(slot).unwrap().remaining_days, 5);
    session.end_day();
    session.end_day();
    assert_eq!(session.carry().slot(slot).unwrap().remaining_days, 3);
}

#[test]
fn closing_the_shop_spares_carried_parcels() {
    let mut session = session(1);
    let carried = labeled(&mut session, 1, "olive_oil");
    session.store_container(carried).unwrap();
    let stranded = labeled(&mut session, 2, "paperback");
    session.accept_order(CustomerId(3), "wool_scarf").unwrap();

    assert_eq!(session.close_shop(), 2);
    assert!(session.container(stranded).is_none());
    assert_eq!(session.loose_items().count(), 0);
    assert_eq!(session.deliveries().len(), 1);
    assert!(matches!(
        session.accept_order(CustomerId(4), "paperback"),
        Err(SessionError::ShopClosed)
    ));

    let receipt = session.deliver_at("hillside_kitchen").unwrap();
    assert_eq!(receipt.container, carried);
    assert_eq!(receipt.reward, 45);
}

#[test]
fn water_reaches_carried_parcels_only_while_swimming() {
    let mut session = session(1);
    let id = labeled(&mut session, 1, "paperback");
    session.store_container(id).unwrap();

    session.tick(1.0);
    assert!((session.carry().slot(0).unwrap().item.quality() - 100.0).abs() < f32::EPSILON);

    assert!(session.player_entered_water().is_empty());
    session.tick(2.0);
    assert!((session.carry().slot(0).unwrap().item.quality() - 99.0).abs() < f32::EPSILON);

    session.player_left_water();
    session.tick(2.0);
    assert!((session.carry().slot(0).unwrap().item.quality() - 99.0).abs() < f32::EPSILON);
}
