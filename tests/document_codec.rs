//! Интеграционные тесты кодека документов: каноничные байты,
//! согласие представлений между собой и сценарий с записью.

use std::{collections::HashMap, io::Cursor};

use zdoc::{
    from_reader, from_slice, record_field, to_vec, AnyValue, D, DecodeError, Document, Field, M,
    RawD, Record, Registry, Tag, UnknownFields, Value, Writer,
};

/// {x: {a: "b"}} — опорный вектор формата.
const NESTED: &[u8] = &[
    0x16, 0x00, 0x00, 0x00, 0x03, b'x', 0x00, 0x0e, 0x00, 0x00, 0x00, 0x02, b'a', 0x00, 0x02,
    0x00, 0x00, 0x00, b'b', 0x00, 0x00, 0x00,
];

const EMPTY: &[u8] = &[0x05, 0x00, 0x00, 0x00, 0x00];

#[test]
fn test_empty_document_across_representations() {
    assert!(from_slice::<D>(EMPTY).unwrap().is_empty());
    assert!(from_slice::<M>(EMPTY).unwrap().is_empty());
    assert!(from_slice::<RawD>(EMPTY).unwrap().is_empty());
    assert!(Document::from_slice(EMPTY).unwrap().is_empty());
}

#[test]
fn test_nested_vector_across_representations() {
    let d: D = from_slice(NESTED).unwrap();
    let inner = match d.get("x").unwrap() {
        AnyValue::Container(inner) => inner,
        other => panic!("expected container, got {other:?}"),
    };
    assert_eq!(inner.get("a"), Some(&AnyValue::from("b")));

    let m: M = from_slice(NESTED).unwrap();
    assert!(matches!(m.get("x"), Some(AnyValue::Container(_))));

    let doc = Document::from_slice(NESTED).unwrap();
    assert_eq!(
        doc.lookup(&["x", "a"]).unwrap().string().unwrap(),
        "b"
    );

    let raw: RawD = from_slice(NESTED).unwrap();
    assert_eq!(raw.get("x").unwrap().data(), &NESTED[7..21]);
}

/// Все четыре представления воспроизводят опорный вектор байт в байт
/// (у M один элемент, порядок не играет роли).
#[test]
fn test_reencode_canonical_bytes() {
    let d: D = from_slice(NESTED).unwrap();
    assert_eq!(to_vec(&d).unwrap(), NESTED);

    let m: M = from_slice(NESTED).unwrap();
    assert_eq!(to_vec(&m).unwrap(), NESTED);

    let doc = Document::from_slice(NESTED).unwrap();
    assert_eq!(doc.to_vec().unwrap(), NESTED);

    let raw: RawD = from_slice(NESTED).unwrap();
    assert_eq!(to_vec(&raw).unwrap(), NESTED);
}

/// Ленивое и жадное декодирование согласны друг с другом.
#[test]
fn test_lazy_matches_eager() {
    let mut account = D::new();
    account.push("active", true);
    account.push("visits", 41i32);
    account.push("balance", 123_456_789_000i64);
    account.push("name", "ann");
    let mut doc = D::new();
    doc.push("account", account);

    let bytes = to_vec(&doc).unwrap();
    let raw: RawD = from_slice(&bytes).unwrap();
    let inner: RawD = raw.get("account").unwrap().unmarshal().unwrap();

    assert!(inner.get("active").unwrap().unmarshal::<bool>().unwrap());
    assert_eq!(inner.get("visits").unwrap().unmarshal::<i32>().unwrap(), 41);
    assert_eq!(
        inner.get("balance").unwrap().unmarshal::<i64>().unwrap(),
        123_456_789_000
    );
    assert_eq!(
        inner.get("name").unwrap().unmarshal::<String>().unwrap(),
        "ann"
    );

    // расширение при ленивом доступе работает так же, как при жадном
    assert_eq!(
        inner.get("visits").unwrap().unmarshal::<i64>().unwrap(),
        41
    );
}

#[test]
fn test_streaming_source() {
    let doc: D = from_reader(Cursor::new(NESTED.to_vec())).unwrap();
    assert_eq!(to_vec(&doc).unwrap(), NESTED);
}

/// Битая длина документа даёт ошибку со смещением, а не мусор.
#[test]
fn test_corrupt_length_reports_offset() {
    let err = from_slice::<D>(&[0x06, 0x00, 0x00, 0x00, 0x00]).unwrap_err();
    assert!(matches!(
        err.into_inner(),
        DecodeError::InvalidDocumentLength {
            position: 5,
            declared: 6,
            consumed: 5,
        }
    ));
}

#[derive(Debug, Default, PartialEq)]
struct Session {
    user: String,
    ttl: i64,
    meta: HashMap<String, String>,
}

impl Record for Session {
    const FIELDS: &'static [Field<Self>] = &[
        record_field!(Session, user, "User"),
        record_field!(Session, ttl),
        record_field!(Session, meta),
    ];
}

/// Запись с картой внутри ходит через провод через свой реестр;
/// неизвестные ключи пропускаются по умолчанию.
#[test]
fn test_record_with_nested_map() {
    let mut reg = Registry::with_defaults();
    reg.register_record::<Session>();
    let reg = std::sync::Arc::new(reg);

    let mut meta = HashMap::new();
    meta.insert("region".to_string(), "eu".to_string());
    let session = Session {
        user: "ann".to_string(),
        ttl: 3600,
        meta,
    };

    let bytes = reg.encode_to_vec(&session).unwrap();
    let back: Session = reg.decode_from_slice(&bytes).unwrap();
    assert_eq!(back, session);

    // документ шире схемы: лишний ключ и другой регистр имени
    let mut writer = Writer::new();
    writer.write_document().unwrap();
    writer.write_element("user").unwrap();
    writer.write_string("bob").unwrap();
    writer.write_element("trace").unwrap();
    writer.write_document().unwrap();
    writer.write_end_document().unwrap();
    writer.write_end_document().unwrap();

    let back: Session = reg
        .decode_from_slice(&writer.into_vec().unwrap())
        .unwrap();
    assert_eq!(back.user, "bob");
    assert_eq!(back.ttl, 0);
}

/// Политика Reject у того же типа в отдельном реестре.
#[test]
fn test_record_reject_policy_per_registry() {
    let mut reg = Registry::with_defaults();
    reg.register_record_with::<Session>(UnknownFields::Reject);
    let reg = std::sync::Arc::new(reg);

    let mut writer = Writer::new();
    writer.write_document().unwrap();
    writer.write_element("rogue").unwrap();
    writer.write_boolean(true).unwrap();
    writer.write_end_document().unwrap();

    let err = reg
        .decode_from_slice::<Session>(&writer.into_vec().unwrap())
        .unwrap_err();
    assert!(matches!(
        err.into_inner(),
        DecodeError::UnknownKey { key } if key == "rogue"
    ));
}

/// Индексированный документ редактируется и уходит на провод в
/// порядке правок.
#[test]
fn test_document_edit_then_encode() {
    let mut doc = Document::from_slice(NESTED).unwrap();
    doc.append("count", 2i32);
    doc.set("count", 3i32);
    doc.prepend("head", "first");

    let bytes = doc.to_vec().unwrap();
    let back = Document::from_slice(&bytes).unwrap();

    let keys: Vec<&str> = back.iter().map(|e| e.key()).collect();
    assert_eq!(keys, ["head", "x", "count"]);
    assert_eq!(back.get("count").unwrap().int32().unwrap(), 3);
    assert_eq!(back.lookup(&["x", "a"]).unwrap().string().unwrap(), "b");
}

/// Значения документов совместимы между представлениями: вложенный
/// документ, собранный из Document, читается как D.
#[test]
fn test_value_bridges_representations() {
    let mut inner = Document::new();
    inner.append("n", 5i32);
    let mut doc = Document::new();
    doc.append("sub", Value::from_document(&inner).unwrap());
    assert_eq!(doc.get("sub").unwrap().tag(), Tag::Document);

    let d: D = from_slice(&doc.to_vec().unwrap()).unwrap();
    match d.get("sub").unwrap() {
        AnyValue::Container(sub) => assert_eq!(sub.get("n"), Some(&AnyValue::Int32(5))),
        other => panic!("expected container, got {other:?}"),
    }
}
