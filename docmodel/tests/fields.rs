use docmodel::{
    bson::{Bson, doc, oid::ObjectId},
    fields,
    memory::InMemoryStore,
    prelude::*,
};

#[derive(Debug, Default, Record)]
#[record(collection = "profiles", sequential_id)]
pub struct Profile {
    id: Option<Id>,
    pub name: String,
    pub age: i32,
    pub tags: Vec<String>,
    pub(crate) session: String,
    password_hash: String,
}

#[derive(Debug, Default, Record)]
#[record(collection = "articles")]
pub struct Article {
    #[record(id)]
    key: Option<Id>,
    pub title: String,
    #[record(rename = "body_text")]
    pub body: String,
    #[record(skip)]
    pub rendered: String,
    pub author: Option<Id>,
    pub meta: docmodel::bson::Document,
}

#[test]
fn only_public_fields_are_registered() {
    assert_eq!(Profile::field_names(), &["name", "age", "tags"]);
    assert_eq!(Article::field_names(), &["title", "body_text", "author", "meta"]);
}

#[test]
fn persisted_fields_exclude_private_state() {
    let profile = Profile {
        name: "Ada".into(),
        age: 36,
        tags: vec!["math".into()],
        session: "abc".into(),
        password_hash: "secret".into(),
        ..Default::default()
    };

    let document = profile.persisted_fields().unwrap();

    assert_eq!(document, doc! { "name": "Ada", "age": 36, "tags": ["math"] });
}

#[tokio::test]
async fn private_fields_never_reach_the_store() {
    let store = DocumentStore::new(InMemoryStore::new());

    let mut profile = Profile {
        name: "Ada".into(),
        password_hash: "secret".into(),
        ..Default::default()
    };
    profile.update(&store, UpdateOptions::default()).await.unwrap();

    let stored = store
        .collection("profiles")
        .find_one(Some(Filter::id(profile.id().unwrap())), None)
        .await
        .unwrap()
        .unwrap();

    assert!(!stored.contains_key("password_hash"));
    assert!(!stored.contains_key("session"));
    assert_eq!(stored.get("_id"), Some(&Bson::Int64(1)));
}

#[tokio::test]
async fn loading_leaves_private_fields_at_their_defaults() {
    let store = DocumentStore::new(InMemoryStore::new());
    store
        .collection("profiles")
        .insert(doc! { "_id": 5_i64, "name": "Eve", "password_hash": "leaked" })
        .await
        .unwrap();

    let loaded = Profile::construct(&store, Some(Id::Int(5))).await.unwrap();

    assert_eq!(loaded.name, "Eve");
    assert_eq!(loaded.age, 0);
    assert_eq!(loaded.password_hash, "");
}

#[test]
fn to_json_sorts_keys_and_stringifies_the_id() {
    let mut profile = Profile {
        name: "Zed".into(),
        age: 3,
        ..Default::default()
    };
    assert_eq!(profile.to_json().as_deref(), Some(r#"{"age":3,"name":"Zed","tags":[]}"#));

    profile.set_id(Some(Id::Int(7)));
    assert_eq!(
        profile.to_json().as_deref(),
        Some(r#"{"_id":"7","age":3,"name":"Zed","tags":[]}"#)
    );
}

#[test]
fn to_json_stringifies_nested_ids() {
    let oid = ObjectId::new();
    let author = ObjectId::new();

    let mut article = Article {
        title: "Ids".into(),
        body: "...".into(),
        rendered: "<p>...</p>".into(),
        author: Some(Id::Object(author)),
        meta: doc! { "source": { "_id": 12_i64, "name": "feeds" } },
        ..Default::default()
    };
    article.set_id(Some(Id::Object(oid)));

    let json = fields::to_json_value(&article).unwrap();

    assert_eq!(json["_id"], oid.to_hex());
    assert_eq!(json["author"], author.to_hex());
    assert_eq!(json["meta"]["source"]["_id"], "12");
    assert_eq!(json["body_text"], "...");
    assert!(json.get("rendered").is_none());
}

#[tokio::test]
async fn custom_id_field_and_renamed_fields_round_trip() {
    let store = DocumentStore::new(InMemoryStore::new());

    let mut article = Article {
        title: "Hello".into(),
        body: "World".into(),
        rendered: "cached".into(),
        ..Default::default()
    };
    article.update(&store, UpdateOptions::default()).await.unwrap();
    assert!(article.key.is_some());

    let stored = store
        .collection("articles")
        .find_one(Some(Filter::eq("title", "Hello")), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.get_str("body_text").unwrap(), "World");
    assert!(!stored.contains_key("rendered"));

    let loaded = Article::construct(&store, article.key.clone()).await.unwrap();
    assert_eq!(loaded.body, "World");
    assert_eq!(loaded.rendered, "");
}
