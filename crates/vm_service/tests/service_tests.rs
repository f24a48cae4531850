use chrono::{TimeZone, Utc};
use vm_proto::{Card, Credential, File, Payload, Text, WireData, WireDataType, WireItem, WireMeta};
use vm_service::{ErrorKind, ItemService, Limits};
use vm_store::{SqliteItemStore, Store};

async fn service() -> (tempfile::TempDir, ItemService<SqliteItemStore>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(&dir.path().join("vault.db"), 4)
        .await
        .expect("open store");
    (dir, ItemService::new(store.items(), Limits::default()))
}

fn meta(tag: &str, text: &str) -> WireMeta {
    WireMeta {
        tag: tag.into(),
        text: text.into(),
    }
}

#[tokio::test]
async fn credential_roundtrips_through_the_boundary() {
    let (_dir, service) = service().await;
    let draft = WireItem::draft(
        "gmail",
        Credential { login: "x".into(), password: "y".into() }.into(),
        vec![meta("site", "gmail.com")],
    );

    let id = service.create_item("u1", draft.clone()).await.unwrap();
    assert!(!id.is_empty());

    let fetched = service.get_item("u1", &id).await.unwrap();
    assert_eq!(fetched.id, id);
    assert_eq!(fetched.user_id, "u1");
    assert_eq!(fetched.data_type, WireDataType::Credential);
    assert_eq!(fetched.data, draft.data);
    assert_eq!(fetched.meta, vec![meta("site", "gmail.com")]);
    assert_eq!(fetched.version, 1);
    assert!(fetched.created_at.is_some());
}

#[tokio::test]
async fn all_variants_come_back_as_sent() {
    let (_dir, service) = service().await;
    let payloads: Vec<Payload> = vec![
        Credential { login: "l".into(), password: "p".into() }.into(),
        Text { data: "t".into() }.into(),
        Card {
            number: "4000000000000002".into(),
            owner: "O".into(),
            validity_to: Utc.with_ymd_and_hms(2031, 12, 31, 0, 0, 0).unwrap(),
        }
        .into(),
        File { name: "f".into(), extension: "bin".into(), data: vec![1, 2, 3] }.into(),
    ];

    for payload in payloads {
        let id = service
            .create_item("u1", WireItem::draft("x", payload.clone(), vec![]))
            .await
            .unwrap();
        let fetched = service.get_item("u1", &id).await.unwrap();
        assert_eq!(fetched.data, Some(payload.into_wire()));
    }
}

#[tokio::test]
async fn missing_item_is_not_found() {
    let (_dir, service) = service().await;
    let err = service.get_item("u1", "nonexistent-id").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn update_renames_and_replaces_meta() {
    let (_dir, service) = service().await;
    let id = service
        .create_item(
            "u1",
            WireItem::draft("old", Text { data: "v1".into() }.into(), vec![meta("site", "a")]),
        )
        .await
        .unwrap();

    let mut item = service.get_item("u1", &id).await.unwrap();
    item.name = "new".into();
    item.version += 1;
    item.meta = vec![meta("site", "b")];
    item.data = Some(WireData::Text(Text { data: "v2".into() }));
    assert_eq!(service.update_item("u1", item).await.unwrap(), id);

    let fetched = service.get_item("u1", &id).await.unwrap();
    assert_eq!(fetched.name, "new");
    assert_eq!(fetched.version, 2);
    assert_eq!(fetched.meta, vec![meta("site", "b")]);
    assert_eq!(fetched.data, Some(WireData::Text(Text { data: "v2".into() })));
}

#[tokio::test]
async fn changing_the_type_on_update_is_rejected() {
    let (_dir, service) = service().await;
    let id = service
        .create_item("u1", WireItem::draft("n", Text { data: "t".into() }.into(), vec![]))
        .await
        .unwrap();

    let mut item = service.get_item("u1", &id).await.unwrap();
    item.data_type = WireDataType::Credential;
    item.data = Some(WireData::Credential(Credential { login: "a".into(), password: "b".into() }));

    let err = service.update_item("u1", item).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidPayloadType);
    assert_eq!(
        service.get_item("u1", &id).await.unwrap().data_type,
        WireDataType::Text
    );
}

#[tokio::test]
async fn listing_pages_through_the_callers_items() {
    let (_dir, service) = service().await;
    for i in 0..4 {
        service
            .create_item(
                "u1",
                WireItem::draft(format!("n{i}"), Text { data: i.to_string() }.into(), vec![]),
            )
            .await
            .unwrap();
    }

    let first = service.list_items("u1", 2, 0).await.unwrap();
    let second = service.list_items("u1", 2, 2).await.unwrap();
    let mut ids: Vec<_> = first.iter().chain(second.iter()).map(|i| i.id.clone()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);

    assert_eq!(service.list_items("u1", 0, 0).await.unwrap().len(), 4);
    assert!(service.list_items("someone-else", 0, 0).await.unwrap().is_empty());
}
