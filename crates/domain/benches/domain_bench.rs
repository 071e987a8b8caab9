use common::OrderId;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use domain::{
    AddItem, Aggregate, ConfirmOrder, CreateOrder, Money, Order, OrderEvent, OrderItem,
    OrderService, ProcessOrder, ShipOrder,
};
use event_store::{
    AppendOptions, EventEnvelope, InMemoryEventStore, NullPublisher, Version, store::EventStore,
};

fn envelope(order_id: OrderId, version: i64, event: &OrderEvent) -> EventEnvelope {
    EventEnvelope::builder()
        .order_id(order_id)
        .event_type(domain::DomainEvent::event_type(event))
        .version(Version::new(version))
        .payload(event)
        .unwrap()
        .build()
}

fn bench_create(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/create", |b| {
        b.to_async(&rt).iter(|| async {
            let service = OrderService::new(InMemoryEventStore::new(), NullPublisher);
            service
                .create_order(CreateOrder::with_generated_id())
                .await
                .unwrap();
        });
    });
}

fn bench_add_line(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = OrderService::new(InMemoryEventStore::new(), NullPublisher);
    let cmd = CreateOrder::with_generated_id();
    let order_id = cmd.order_id.clone();
    rt.block_on(async { service.create_order(cmd).await.unwrap() });

    c.bench_function("domain/add_line", |b| {
        b.to_async(&rt).iter(|| async {
            service
                .add_item(AddItem::new(
                    order_id.clone(),
                    "SKU-BENCH",
                    "Benchmark Widget",
                    1,
                    Money::from_cents(1000),
                ))
                .await
                .unwrap();
        });
    });
}

/// Create through ship: five commands, five appends, each one replaying the
/// order first.
fn bench_full_lifecycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/lifecycle_create_to_shipped", |b| {
        b.to_async(&rt).iter(|| async {
            let service = OrderService::new(InMemoryEventStore::new(), NullPublisher);
            let cmd = CreateOrder::with_generated_id();
            let order_id = cmd.order_id.clone();

            service.create_order(cmd).await.unwrap();
            service
                .add_item(AddItem::new(
                    order_id.clone(),
                    "SKU-001",
                    "Widget",
                    2,
                    Money::from_cents(1000),
                ))
                .await
                .unwrap();
            service
                .confirm_order(ConfirmOrder::new(order_id.clone()))
                .await
                .unwrap();
            service
                .process_order(ProcessOrder::new(order_id.clone()))
                .await
                .unwrap();
            service
                .ship_order(ShipOrder::new(order_id, "TRACK-123"))
                .await
                .unwrap();
        });
    });
}

async fn seed_history(store: &InMemoryEventStore, order_id: &OrderId, event_count: i64) {
    let created = OrderEvent::order_created(order_id.clone(), None, None, None, None);
    let mut events = vec![envelope(order_id.clone(), 1, &created)];
    for v in 2..=event_count {
        let item = OrderItem::new(
            format!("SKU-{v:03}").as_str(),
            format!("Product {v}").as_str(),
            1,
            Money::from_cents(100 * v),
        );
        events.push(envelope(order_id.clone(), v, &OrderEvent::item_added(&item)));
    }
    store.append(events, AppendOptions::new()).await.unwrap();
}

fn bench_replay(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("domain/replay");

    for &event_count in &[50_i64, 100] {
        let store = InMemoryEventStore::new();
        let order_id = OrderId::generate();
        rt.block_on(seed_history(&store, &order_id, event_count));

        group.throughput(Throughput::Elements(event_count as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(event_count),
            &(store, order_id),
            |b, (store, order_id)| {
                b.to_async(&rt).iter(|| async {
                    let events = store.events_for_order(order_id).await.unwrap();
                    let mut order = Order::default();
                    for event in &events {
                        let domain_event: OrderEvent =
                            serde_json::from_value(event.payload.clone()).unwrap();
                        order.apply(domain_event);
                    }
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_create,
    bench_add_line,
    bench_full_lifecycle,
    bench_replay,
);
criterion_main!(benches);
