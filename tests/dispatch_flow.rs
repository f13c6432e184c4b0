use prodwire::host::{
    Dispatcher, Envelope, ExternalWrapper, MemoryHost, MemoryWrapper, Reply, Resolve, Status,
    Upgraded,
};
use prodwire::protocol::Origin;
use prodwire::{CodecConfig, TypeRegistry, message, register_messages};

mod p1 {
    prodwire::message! {
        pub struct A in "P1" as Json {
            pub label: String,
        }
    }
}

mod p2 {
    prodwire::message! {
        pub struct A in "P2" as Binary {
            pub count: u32,
        }
    }
}

message! {
    pub struct Quote in "sales" as Json {
        pub sku: String,
        #[column]
        pub price_cents: u64,
    }
}

fn registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    register_messages!(registry; p1::A, p2::A, Quote).unwrap();
    registry
}

fn host() -> MemoryHost {
    MemoryHost::new()
        .declare("P1.A", Vec::<String>::new())
        .declare("P2.A", Vec::<String>::new())
        .declare("sales.Quote", ["price_cents"])
}

#[test]
fn same_class_name_resolves_per_package() {
    let registry = registry();
    let dispatcher = Dispatcher::new(&registry).with_config(CodecConfig::default().with_chunk_size(2));

    let first = Envelope::fresh(p1::A { label: "one".into() }, &host())
        .unwrap()
        .into_outbound()
        .unwrap();
    let second = Envelope::fresh(p2::A { count: 2 }, &host())
        .unwrap()
        .into_outbound()
        .unwrap();

    let first = dispatcher.upgrade(first).unwrap().into_resolved().unwrap();
    let second = dispatcher.upgrade(second).unwrap().into_resolved().unwrap();
    assert!(first.is::<p1::A>());
    assert!(second.is::<p2::A>());
    assert_eq!(first.to_string(), "A(label=\"one\")");
    assert_eq!(second.to_string(), "A(count=2)");
}

#[test]
fn unknown_objects_pass_through_untouched() {
    let registry = registry();
    let raw = Box::new(MemoryWrapper::new("Ens.StringContainer").with_stream("payload"));

    match Dispatcher::new(&registry).upgrade(raw).unwrap() {
        Upgraded::Passthrough(raw) => {
            assert_eq!(raw.qualified_name(), "Ens.StringContainer");
        }
        Upgraded::Resolved(envelope) => panic!("unexpected resolution to {envelope}"),
    }
}

#[test]
fn frozen_registry_serves_lookups() {
    let frozen = registry().freeze();
    assert_eq!(frozen.len(), 3);
    assert!(frozen.resolve("sales.Quote").is_some());
    assert!(frozen.lookup("sales.Invoice").unwrap_err().is_lookup());
}

#[test]
fn handler_round_trip() {
    let registry = registry();
    let dispatcher = Dispatcher::new(&registry);

    let request = Envelope::fresh(
        Quote {
            sku: "KB-101".into(),
            price_cents: 4_999,
        },
        &host(),
    )
    .unwrap()
    .into_outbound()
    .unwrap();

    let inbound = dispatcher.upgrade_as::<Quote>(request).unwrap();
    assert_eq!(inbound.origin(), Origin::Rehydrated);

    let mut response = Envelope::fresh(inbound.into_parts().0, &host()).unwrap();
    response.message_mut().price_cents -= 500;

    let reply = Reply::from_outcome((Status::ok(), response)).unwrap();
    assert!(reply.status.is_ok());
    assert!(reply.response_available);

    let wrapper = reply.response.unwrap();
    assert_eq!(wrapper.field("price_cents"), Some(serde_json::json!(4_499)));
    let quote = dispatcher.upgrade_as::<Quote>(wrapper).unwrap();
    assert_eq!(quote.message().price_cents, 4_499);
    assert_eq!(quote.message().sku, "KB-101");
}
