use std::collections::HashSet;

use winapp_core::{attrs, App, AppId, Architecture, AttributeList, AttributeType, Scope};

use super::*;
use crate::marshal::decode_utf16;

fn uninstall_store() -> MemoryStore {
    let store = MemoryStore::new();
    for view in View::ALL {
        store.create_path(view.hive(), view.word_width(), UNINSTALL_ROOT);
    }
    store
}

fn sample_app(id: &str) -> App {
    App::new(
        id,
        vec![
            attrs::display_name("Test Application (winapp)"),
            attrs::display_version("0.0.0"),
            attrs::publisher("Test Publisher"),
            attrs::install_date("20240131"),
            attrs::expandable("InstallLocation", "%ProgramFiles%\\Test"),
            attrs::estimated_size(1024),
        ],
    )
}

fn attribute_set(list: &AttributeList) -> HashSet<(String, String, AttributeType)> {
    list.iter()
        .map(|attr| (attr.name.clone(), attr.data.clone(), attr.kind))
        .collect()
}

fn raw_app_key(store: &MemoryStore, view: View, id: &str) -> MemoryKey {
    let root = store
        .open_root(
            view.hive(),
            UNINSTALL_ROOT,
            Access::CREATE_SUB_KEY,
            view.word_width(),
        )
        .expect("must open uninstall root");
    let (key, existed) = root
        .create_subkey(id, Access::SET_VALUE | Access::QUERY_VALUE)
        .expect("must create app key");
    assert!(!existed);
    key
}

#[test]
fn added_app_reads_back_with_same_attributes() {
    let store = uninstall_store();
    let view = View::MACHINE_64;
    let app = sample_app("winapp-test-app");

    view.add(&store, &app).expect("add must succeed");
    let read = view.get(&store, &app.id).expect("get must succeed");

    assert_eq!(read.id, app.id);
    assert_eq!(attribute_set(&read.attributes), attribute_set(&app.attributes));
}

#[test]
fn estimated_size_reads_back_as_decimal_text() {
    let store = uninstall_store();
    let view = View::USER_64;
    let app = App::new("sized", vec![attrs::estimated_size(1024)]);

    view.add(&store, &app).expect("add must succeed");
    let read = view.get(&store, &app.id).expect("get must succeed");

    assert_eq!(read.attributes.get_string("EstimatedSize"), "1024");
    assert_eq!(
        read.attributes.get("EstimatedSize").map(|attr| attr.kind),
        Some(AttributeType::Uint32)
    );
}

#[test]
fn adding_existing_app_fails_and_keeps_original_attributes() {
    let store = uninstall_store();
    let view = View::MACHINE_32;
    let first = App::new("dup", vec![attrs::display_name("First")]);
    let second = App::new(
        "dup",
        vec![attrs::display_name("Second"), attrs::publisher("Other")],
    );

    view.add(&store, &first).expect("first add must succeed");
    let err = view
        .add(&store, &second)
        .expect_err("second add must fail");

    assert!(
        matches!(&err, RegistryError::AlreadyExists { view: "32-bit machine", id } if id.as_str() == "dup"),
        "unexpected error: {err:?}"
    );
    let read = view.get(&store, &first.id).expect("get must succeed");
    assert_eq!(attribute_set(&read.attributes), attribute_set(&first.attributes));
}

#[test]
fn missing_app_is_reported_as_not_found_or_absent() {
    let store = uninstall_store();
    let view = View::USER_32;
    let id = AppId::from("missing");

    let err = view.remove(&store, &id).expect_err("remove must fail");
    assert!(matches!(err, RegistryError::NotFound { .. }), "unexpected error: {err:?}");

    let err = view.get(&store, &id).expect_err("get must fail");
    assert!(matches!(err, RegistryError::NotFound { .. }), "unexpected error: {err:?}");

    assert!(!view.contains(&store, &id).expect("contains must succeed"));
}

#[test]
fn partitions_are_isolated() {
    let store = uninstall_store();
    let app = sample_app("isolated");

    View::MACHINE_64.add(&store, &app).expect("add must succeed");

    assert!(View::MACHINE_64
        .contains(&store, &app.id)
        .expect("contains must succeed"));
    for view in [View::MACHINE_32, View::USER_32, View::USER_64] {
        assert!(
            !view.contains(&store, &app.id).expect("contains must succeed"),
            "app leaked into the {} view",
            view.name()
        );
    }
}

#[test]
fn same_id_may_hold_unrelated_records_in_each_partition() {
    let store = uninstall_store();
    for view in View::ALL {
        let app = App::new("shared", vec![attrs::comments(view.name())]);
        view.add(&store, &app).expect("add must succeed");
    }

    for view in View::ALL {
        let read = view
            .get(&store, &AppId::from("shared"))
            .expect("get must succeed");
        assert_eq!(read.attributes.get_string("Comments"), view.name());
    }
}

#[test]
fn long_string_values_grow_the_read_buffer() {
    let store = uninstall_store();
    let view = View::MACHINE_64;
    let long_name = "n".repeat(10_000);
    let app = App::new(
        "long",
        vec![
            attrs::display_name(long_name.clone()),
            attrs::publisher("after the long value"),
        ],
    );
    assert!(long_name.len() * 2 > READ_BUFFER_SIZE);

    view.add(&store, &app).expect("add must succeed");
    let read = view.get(&store, &app.id).expect("get must succeed");

    assert_eq!(read.attributes.get_string("DisplayName"), long_name);
    assert_eq!(read.attributes.get_string("Publisher"), "after the long value");
}

#[test]
fn values_just_below_the_size_ceiling_are_read() {
    let store = uninstall_store();
    let view = View::MACHINE_64;
    let key = raw_app_key(&store, view, "big");
    key.set_raw_value(
        "Comments",
        ValueKind::String,
        b"ab".repeat((MAX_VALUE_SIZE - 2) / 2),
    )
    .expect("raw write must succeed");
    drop(key);

    let read = view
        .get(&store, &AppId::from("big"))
        .expect("get must succeed");
    assert_eq!(
        read.attributes.get_string("Comments").chars().count(),
        (MAX_VALUE_SIZE - 2) / 2
    );
}

#[test]
fn values_at_the_size_ceiling_are_refused() {
    let store = uninstall_store();
    let view = View::MACHINE_64;
    let key = raw_app_key(&store, view, "huge");
    key.set_raw_value("Comments", ValueKind::String, vec![b'a'; MAX_VALUE_SIZE])
        .expect("raw write must succeed");
    drop(key);

    let err = view
        .get(&store, &AppId::from("huge"))
        .expect_err("oversized value must be refused");
    assert!(
        matches!(
            &err,
            RegistryError::Store {
                source: StoreError::MoreData { required },
                target: Target::Value { name, .. },
                ..
            } if *required == MAX_VALUE_SIZE && name == "Comments"
        ),
        "unexpected error: {err:?}"
    );
}

#[test]
fn list_returns_every_app_in_the_view() {
    let store = uninstall_store();
    let view = View::USER_64;
    let a = sample_app("app-a");
    let b = App::new("app-b", vec![attrs::display_name("B"), attrs::version(7)]);

    view.add(&store, &a).expect("add a must succeed");
    view.add(&store, &b).expect("add b must succeed");
    View::USER_32
        .add(&store, &sample_app("app-c"))
        .expect("add c must succeed");

    let apps = view.list(&store).expect("list must succeed");
    assert_eq!(apps.len(), 2);
    let ids = apps
        .iter()
        .map(|app| app.id.as_str())
        .collect::<HashSet<_>>();
    assert_eq!(ids, HashSet::from(["app-a", "app-b"]));
    for app in &apps {
        let expected = if app.id == a.id { &a } else { &b };
        assert_eq!(attribute_set(&app.attributes), attribute_set(&expected.attributes));
    }
}

#[test]
fn list_of_empty_view_is_empty() {
    let store = uninstall_store();
    assert!(View::MACHINE_32
        .list(&store)
        .expect("list must succeed")
        .is_empty());
}

#[test]
fn list_aborts_on_first_unreadable_app_and_names_it() {
    let store = uninstall_store();
    let view = View::MACHINE_64;
    view.add(&store, &sample_app("app-a"))
        .expect("add must succeed");
    let key = raw_app_key(&store, view, "app-b");
    key.set_raw_value("EstimatedSize", ValueKind::Dword, vec![1, 2])
        .expect("raw write must succeed");
    drop(key);

    let err = view.list(&store).expect_err("list must fail");
    assert!(
        matches!(&err, RegistryError::MalformedValue { id, name, .. } if id.as_str() == "app-b" && name == "EstimatedSize"),
        "unexpected error: {err:?}"
    );
    assert!(err.to_string().contains("\"app-b\""), "unexpected message: {err}");
}

#[test]
fn list_names_the_value_that_could_not_be_read() {
    let store = uninstall_store();
    let view = View::USER_64;
    view.add(&store, &sample_app("app-a"))
        .expect("add must succeed");
    let key = raw_app_key(&store, view, "app-b");
    key.set_raw_value("Comments", ValueKind::String, vec![b'a'; MAX_VALUE_SIZE])
        .expect("raw write must succeed");
    drop(key);

    let err = view.list(&store).expect_err("list must fail");
    assert!(
        err.to_string()
            .starts_with("failed to read value \"Comments\" of application \"app-b\""),
        "unexpected message: {err}"
    );
}

#[test]
fn foreign_value_types_are_skipped_on_read() {
    let store = uninstall_store();
    let view = View::MACHINE_64;
    let key = raw_app_key(&store, view, "foreign");
    key.set_string("DisplayName", "Foreign").expect("write must succeed");
    key.set_raw_value("Binary", ValueKind::Other(3), vec![0xde, 0xad])
        .expect("raw write must succeed");
    key.set_raw_value("Nothing", ValueKind::None, Vec::new())
        .expect("raw write must succeed");
    key.set_raw_value("Multi", ValueKind::Other(7), vec![0, 0])
        .expect("raw write must succeed");
    drop(key);

    let read = view
        .get(&store, &AppId::from("foreign"))
        .expect("get must succeed");
    assert_eq!(read.attributes.len(), 1);
    assert_eq!(read.attributes.get_string("DisplayName"), "Foreign");
}

#[test]
fn integer_values_must_be_four_bytes_long() {
    let store = uninstall_store();
    let view = View::USER_64;
    let key = raw_app_key(&store, view, "wide-int");
    key.set_raw_value("Version", ValueKind::Dword, vec![0; 8])
        .expect("raw write must succeed");
    drop(key);

    let err = view
        .get(&store, &AppId::from("wide-int"))
        .expect_err("get must fail");
    assert!(
        matches!(&err, RegistryError::MalformedValue { reason, .. } if reason.contains("8 bytes")),
        "unexpected error: {err:?}"
    );
}

#[test]
fn empty_and_unterminated_strings_decode() {
    let store = uninstall_store();
    let view = View::MACHINE_32;
    let key = raw_app_key(&store, view, "strings");
    key.set_raw_value("Empty", ValueKind::String, Vec::new())
        .expect("raw write must succeed");
    key.set_raw_value(
        "Unterminated",
        ValueKind::ExpandString,
        "%TEMP%".encode_utf16().flat_map(u16::to_le_bytes).collect(),
    )
    .expect("raw write must succeed");
    drop(key);

    let read = view
        .get(&store, &AppId::from("strings"))
        .expect("get must succeed");
    let empty = read.attributes.get("Empty").expect("empty value must be read");
    assert_eq!(empty.data, "");
    assert_eq!(empty.kind, AttributeType::String);
    let expand = read
        .attributes
        .get("Unterminated")
        .expect("unterminated value must be read");
    assert_eq!(expand.data, "%TEMP%");
    assert_eq!(expand.kind, AttributeType::Expand);
}

#[test]
fn decode_utf16_stops_at_reported_length_or_nul() {
    assert_eq!(decode_utf16(&[]), "");
    assert_eq!(decode_utf16(&[b'h', 0, b'i', 0]), "hi");
    assert_eq!(decode_utf16(&[b'h', 0, b'i', 0, 0, 0]), "hi");
    assert_eq!(decode_utf16(&[b'h', 0, 0, 0, b'x', 0]), "h");
    assert_eq!(decode_utf16(&[b'h', 0, b'i']), "h");
    assert_eq!(decode_utf16(&[0x3d, 0xd8, 0x00, 0xde]), "\u{1f600}");
    assert_eq!(decode_utf16(&[0x3d, 0xd8]), "\u{fffd}");
}

#[test]
fn invalid_number_stops_add_without_rolling_back() {
    let store = uninstall_store();
    let view = View::MACHINE_64;
    let app = App::new(
        "partial",
        vec![
            attrs::display_name("Partial"),
            winapp_core::AttributeValue::new("EstimatedSize", "12kb", AttributeType::Uint32),
            attrs::publisher("Never written"),
        ],
    );

    let err = view.add(&store, &app).expect_err("add must fail");
    assert!(
        matches!(&err, RegistryError::MalformedValue { name, .. } if name == "EstimatedSize"),
        "unexpected error: {err:?}"
    );

    let read = view.get(&store, &app.id).expect("get must succeed");
    assert_eq!(read.attributes.len(), 1);
    assert_eq!(read.attributes.get_string("DisplayName"), "Partial");
}

#[test]
fn numbers_outside_u32_are_malformed() {
    let store = uninstall_store();
    let view = View::MACHINE_64;
    for (id, data) in [("overflow", "4294967296"), ("signed", "-1"), ("plus", "+5"), ("blank", "")] {
        let app = App::new(
            id,
            vec![winapp_core::AttributeValue::new("Version", data, AttributeType::Uint32)],
        );
        let err = view.add(&store, &app).expect_err("add must fail");
        assert!(
            matches!(err, RegistryError::MalformedValue { .. }),
            "unexpected error for {data:?}: {err:?}"
        );
    }
}

#[test]
fn untyped_attributes_are_rejected_on_write() {
    let store = uninstall_store();
    let view = View::USER_32;
    let app = App::new(
        "untyped",
        vec![winapp_core::AttributeValue::new("Comments", "hi", AttributeType::None)],
    );

    let err = view.add(&store, &app).expect_err("add must fail");
    assert!(
        matches!(&err, RegistryError::UnsupportedAttributeType { kind: AttributeType::None, name, .. } if name == "Comments"),
        "unexpected error: {err:?}"
    );
}

#[test]
fn string_data_with_nul_is_rejected_on_write() {
    let store = uninstall_store();
    let view = View::USER_32;
    let app = App::new("nul", vec![attrs::comments("before\0after")]);

    let err = view.add(&store, &app).expect_err("add must fail");
    assert!(matches!(err, RegistryError::MalformedValue { .. }), "unexpected error: {err:?}");
}

#[test]
fn remove_deletes_the_app_and_its_values() {
    let store = uninstall_store();
    let view = View::MACHINE_64;
    let app = sample_app("short-lived");

    view.add(&store, &app).expect("add must succeed");
    view.remove(&store, &app.id).expect("remove must succeed");

    assert!(!view.contains(&store, &app.id).expect("contains must succeed"));
    view.add(&store, &App::new("short-lived", vec![attrs::comments("again")]))
        .expect("re-add must succeed");
    let read = view.get(&store, &app.id).expect("get must succeed");
    assert_eq!(read.attributes.len(), 1);
}

#[test]
fn app_ids_match_case_insensitively() {
    let store = uninstall_store();
    let view = View::MACHINE_64;
    view.add(&store, &sample_app("Vendor.Tool"))
        .expect("add must succeed");

    assert!(view
        .contains(&store, &AppId::from("vendor.tool"))
        .expect("contains must succeed"));
    let err = view
        .add(&store, &sample_app("VENDOR.TOOL"))
        .expect_err("add must fail");
    assert!(matches!(err, RegistryError::AlreadyExists { .. }), "unexpected error: {err:?}");

    let listed = view.list(&store).expect("list must succeed");
    assert_eq!(listed[0].id.as_str(), "Vendor.Tool");
}

#[test]
fn invalid_ids_are_rejected_before_touching_the_store() {
    let store = uninstall_store();
    let view = View::MACHINE_64;

    for id in ["", "vendor\\tool"] {
        let err = view
            .add(&store, &App::new(id, vec![attrs::comments("x")]))
            .expect_err("add must fail");
        assert!(matches!(err, RegistryError::InvalidId { .. }), "unexpected error: {err:?}");
        let err = view
            .contains(&store, &AppId::from(id))
            .expect_err("contains must fail");
        assert!(matches!(err, RegistryError::InvalidId { .. }), "unexpected error: {err:?}");
    }
    assert!(view.list(&store).expect("list must succeed").is_empty());
}

#[test]
fn denied_access_is_reported_and_not_mistaken_for_absence() {
    let store = uninstall_store();
    let view = View::MACHINE_64;
    view.add(&store, &sample_app("locked"))
        .expect("add must succeed");

    store.restrict(
        view.hive(),
        view.word_width(),
        Access::ENUMERATE_SUB_KEYS | Access::QUERY_VALUE,
    );
    let err = view
        .add(&store, &sample_app("other"))
        .expect_err("add must fail");
    assert!(
        matches!(&err, RegistryError::InsufficientAccess { target: Target::Root, .. }),
        "unexpected error: {err:?}"
    );
    assert!(view
        .contains(&store, &AppId::from("locked"))
        .expect("read-only access must be enough"));

    store.restrict(view.hive(), view.word_width(), Access::NONE);
    let err = view
        .contains(&store, &AppId::from("locked"))
        .expect_err("contains must fail");
    assert!(
        matches!(err, RegistryError::InsufficientAccess { .. }),
        "unexpected error: {err:?}"
    );
    let err = view
        .contains(&store, &AppId::from("missing"))
        .expect_err("contains must fail");
    assert!(
        matches!(err, RegistryError::InsufficientAccess { .. }),
        "unexpected error: {err:?}"
    );

    store.clear_restrictions();
    assert!(View::MACHINE_32
        .list(&store)
        .expect("other views stay readable")
        .is_empty());
}

#[test]
fn missing_uninstall_root_is_a_store_error() {
    let store = MemoryStore::new();
    let err = View::USER_64.list(&store).expect_err("list must fail");
    assert!(
        matches!(
            &err,
            RegistryError::Store {
                target: Target::Root,
                source: StoreError::NotFound,
                ..
            }
        ),
        "unexpected error: {err:?}"
    );
    assert!(err.to_string().contains("64-bit user"), "unexpected message: {err}");
}

#[test]
fn concurrent_adds_of_the_same_id_let_exactly_one_win() {
    for _ in 0..32 {
        let store = uninstall_store();
        let view = View::MACHINE_64;

        let results = std::thread::scope(|scope| {
            let handles = (0..2)
                .map(|n| {
                    let store = &store;
                    scope.spawn(move || {
                        let app = App::new("race", vec![attrs::comments(n.to_string())]);
                        view.add(store, &app)
                    })
                })
                .collect::<Vec<_>>();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("thread must not panic"))
                .collect::<Vec<_>>()
        });

        let winners = results.iter().filter(|result| result.is_ok()).count();
        let losers = results
            .iter()
            .filter(|result| matches!(result, Err(RegistryError::AlreadyExists { .. })))
            .count();
        assert_eq!((winners, losers), (1, 1));
    }
}

#[test]
fn legacy_version_values_named_publisher_read_as_integers() {
    let store = uninstall_store();
    let view = View::MACHINE_32;
    let key = raw_app_key(&store, view, "legacy");
    key.set_dword("Publisher", 3).expect("write must succeed");
    drop(key);

    let read = view
        .get(&store, &AppId::from("legacy"))
        .expect("get must succeed");
    assert_eq!(read.attributes.get_string("Publisher"), "3");
    assert_eq!(
        read.attributes.get("Publisher").map(|attr| attr.kind),
        Some(AttributeType::Uint32)
    );
    assert_eq!(read.attributes.get_string("VersionMajor"), "");
}

#[test]
fn version_parts_are_stored_under_their_own_names() {
    let store = uninstall_store();
    let view = View::MACHINE_64;
    let app = App::new(
        "versioned",
        vec![
            attrs::publisher("Acme"),
            attrs::version_major(2),
            attrs::version_minor(5),
        ],
    );

    view.add(&store, &app).expect("add must succeed");
    let read = view.get(&store, &app.id).expect("get must succeed");

    assert_eq!(read.attributes.get_string("Publisher"), "Acme");
    assert_eq!(read.attributes.get_string("VersionMajor"), "2");
    assert_eq!(read.attributes.get_string("VersionMinor"), "5");
}

#[test]
fn views_cover_each_architecture_and_scope_once() {
    let mut seen = HashSet::new();
    for arch in [Architecture::X86, Architecture::X64] {
        for scope in [Scope::Machine, Scope::User] {
            let view = View::for_target(arch, scope);
            assert_eq!(view.architecture(), arch);
            assert_eq!(view.scope(), scope);
            assert!(View::ALL.contains(&view));
            assert!(seen.insert(view.name()));
        }
    }
    assert_eq!(seen.len(), 4);
    assert_eq!(View::MACHINE_32.word_width(), WordWidth::Bits32);
    assert_eq!(View::USER_64.hive(), Hive::CurrentUser);
}

#[test]
fn view_lookup_by_name_reports_missing_and_unknown_parts() {
    assert_eq!(
        View::for_names("x64", "machine").expect("view must resolve"),
        View::MACHINE_64
    );
    assert_eq!(
        View::for_names(" X86 ", "User").expect("view must resolve"),
        View::USER_32
    );
    assert!(matches!(
        View::for_names("", "machine"),
        Err(RegistryError::MissingArchitecture)
    ));
    assert!(matches!(
        View::for_names("x64", " "),
        Err(RegistryError::MissingScope)
    ));
    assert!(matches!(
        View::for_names("arm64", "machine"),
        Err(RegistryError::UnrecognizedArchitecture(text)) if text == "arm64"
    ));
    let err = View::for_names("x86", "global").expect_err("scope must be rejected");
    assert_eq!(err.to_string(), "unrecognized application scope: global");
}

#[test]
fn memory_store_enforces_rights_on_open_handles() {
    let store = uninstall_store();
    let root = store
        .open_root(
            Hive::LocalMachine,
            UNINSTALL_ROOT,
            Access::ENUMERATE_SUB_KEYS,
            WordWidth::Bits64,
        )
        .expect("root must open");

    assert_eq!(
        root.create_subkey("app", Access::SET_VALUE).err(),
        Some(StoreError::AccessDenied)
    );
    assert_eq!(root.value_names().err(), Some(StoreError::AccessDenied));
    assert_eq!(
        root.open_subkey("app", Access::QUERY_VALUE).err(),
        Some(StoreError::NotFound)
    );
    assert!(root.subkey_names().expect("enumeration must succeed").is_empty());
}

#[test]
fn memory_store_reports_required_size_for_small_buffers() {
    let store = uninstall_store();
    let key = raw_app_key(&store, View::MACHINE_64, "sizes");
    key.set_string("Name", "abc").expect("write must succeed");

    let mut small = [0u8; 4];
    assert_eq!(
        key.get_value("Name", &mut small),
        Err(StoreError::MoreData { required: 8 })
    );
    let mut exact = [0u8; 8];
    assert_eq!(
        key.get_value("Name", &mut exact),
        Ok((8, ValueKind::String))
    );
    assert_eq!(&exact, &[b'a', 0, b'b', 0, b'c', 0, 0, 0]);
}
