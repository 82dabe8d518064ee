use serde_json::{json, Value};
use workbase_core::repo::document_repo::{
    Document, DocumentRepository, FindOptions, Populate, RepoError, SqliteDocumentRepository,
};
use workbase_core::Filter;

fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap()
}

fn repo() -> SqliteDocumentRepository {
    SqliteDocumentRepository::open_in_memory().unwrap()
}

#[test]
fn insert_assigns_missing_ids_and_initial_revision() {
    let repo = repo();
    let stored = repo
        .insert(
            "notes",
            vec![doc(json!({"title": "a"})), doc(json!({"id": "fixed", "title": "b"}))],
        )
        .unwrap();

    assert_eq!(stored.len(), 2);
    assert!(stored[0]["id"].as_str().is_some());
    assert_eq!(stored[1]["id"], json!("fixed"));
    assert_eq!(stored[1]["_rev"], json!(0));
    assert_eq!(repo.count("notes", &Filter::new()).unwrap(), 2);
}

#[test]
fn duplicate_id_rolls_back_the_whole_batch() {
    let repo = repo();
    repo.insert("notes", vec![doc(json!({"id": "n1"}))]).unwrap();

    let err = repo
        .insert(
            "notes",
            vec![doc(json!({"id": "n2"})), doc(json!({"id": "n1"}))],
        )
        .unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
    assert_eq!(repo.count("notes", &Filter::new()).unwrap(), 1);
}

#[test]
fn update_one_reports_matched_and_modified_counts() {
    let repo = repo();
    repo.insert("notes", vec![doc(json!({"id": "n1", "title": "a"}))])
        .unwrap();

    let outcome = repo
        .update_one("notes", &Filter::by_id("n1"), &doc(json!({"title": "b"})))
        .unwrap();
    assert_eq!((outcome.matched_count, outcome.modified_count), (1, 1));

    let outcome = repo
        .update_one("notes", &Filter::by_id("n1"), &doc(json!({"title": "b"})))
        .unwrap();
    assert_eq!((outcome.matched_count, outcome.modified_count), (1, 0));

    let outcome = repo
        .update_one("notes", &Filter::by_id("n2"), &doc(json!({"title": "b"})))
        .unwrap();
    assert_eq!((outcome.matched_count, outcome.modified_count), (0, 0));

    let stored = repo.find_by_id("notes", "n1", &[]).unwrap().unwrap();
    assert_eq!(stored["_rev"], json!(1));
}

#[test]
fn update_one_refuses_to_change_id() {
    let repo = repo();
    repo.insert("notes", vec![doc(json!({"id": "n1"}))]).unwrap();

    let err = repo
        .update_one("notes", &Filter::by_id("n1"), &doc(json!({"id": "n9"})))
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn filters_support_eq_in_contains_and_null() {
    let repo = repo();
    repo.insert(
        "tasks",
        vec![
            doc(json!({"id": "t1", "state": "open", "done": false, "tags": ["x"]})),
            doc(json!({"id": "t2", "state": "closed", "done": true, "tags": ["x", "y"]})),
            doc(json!({"id": "t3", "state": "open", "done": false, "tags": [], "deletedAt": 5})),
        ],
    )
    .unwrap();

    assert_eq!(repo.count("tasks", &Filter::new().eq("state", "open")).unwrap(), 2);
    assert_eq!(repo.count("tasks", &Filter::new().eq("done", true)).unwrap(), 1);
    assert_eq!(
        repo.count("tasks", &Filter::new().is_in("state", ["open", "closed"]))
            .unwrap(),
        3
    );
    assert_eq!(repo.count("tasks", &Filter::new().contains("tags", "y")).unwrap(), 1);
    assert_eq!(
        repo.count("tasks", &Filter::new().eq("deletedAt", Value::Null))
            .unwrap(),
        2
    );
    assert_eq!(
        repo.count("tasks", &Filter::id_in(Vec::<String>::new())).unwrap(),
        0
    );
}

#[test]
fn contains_only_matches_array_fields() {
    let repo = repo();
    repo.insert(
        "people",
        vec![
            doc(json!({"id": "p1", "name": "Ada", "aliases": ["Ada", "Countess"]})),
            doc(json!({"id": "p2", "name": "Ada", "aliases": "Ada"})),
        ],
    )
    .unwrap();

    assert_eq!(repo.count("people", &Filter::new().contains("name", "Ada")).unwrap(), 0);
    let found = repo
        .find("people", &Filter::new().contains("aliases", "Ada"), &FindOptions::default())
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], json!("p1"));
}

#[test]
fn invalid_filter_fields_are_rejected() {
    let repo = repo();
    let err = repo
        .count("tasks", &Filter::new().eq("a.b", 1))
        .unwrap_err();
    assert!(matches!(err, RepoError::InvalidFilterField(field) if field == "a.b"));
}

#[test]
fn find_applies_projection_window_and_population() {
    let repo = repo();
    repo.insert(
        "people",
        vec![doc(json!({"id": "p1", "name": "Ada"})), doc(json!({"id": "p2", "name": "Grace"}))],
    )
    .unwrap();
    repo.insert(
        "teams",
        (0..4)
            .map(|index| {
                doc(json!({
                    "id": format!("team{index}"),
                    "lead": "p1",
                    "members": ["p2", "ghost"],
                    "size": index
                }))
            })
            .collect(),
    )
    .unwrap();

    let populate = [
        Populate {
            field: "lead",
            collection: "people",
        },
        Populate {
            field: "members",
            collection: "people",
        },
    ];
    let options = FindOptions {
        skip: 1,
        limit: Some(2),
        populate: &populate,
        ..FindOptions::default()
    };
    let page = repo.find("teams", &Filter::new(), &options).unwrap();
    let ids: Vec<_> = page.iter().map(|team| team["id"].clone()).collect();
    assert_eq!(ids, vec![json!("team1"), json!("team2")]);
    assert_eq!(page[0]["lead"]["name"], json!("Ada"));
    // Missing list members are dropped.
    assert_eq!(page[0]["members"].as_array().unwrap().len(), 1);

    let projected = repo
        .find(
            "teams",
            &Filter::by_id("team3"),
            &FindOptions {
                projection: Some(&["size"]),
                ..FindOptions::default()
            },
        )
        .unwrap();
    assert_eq!(Value::Object(projected[0].clone()), json!({"id": "team3", "size": 3}));

    let tail = repo
        .find(
            "teams",
            &Filter::new(),
            &FindOptions {
                skip: 3,
                ..FindOptions::default()
            },
        )
        .unwrap();
    assert_eq!(tail.len(), 1);
}

#[test]
fn delete_one_removes_a_single_match() {
    let repo = repo();
    repo.insert(
        "notes",
        vec![doc(json!({"kind": "a"})), doc(json!({"kind": "a"}))],
    )
    .unwrap();

    assert_eq!(repo.delete_one("notes", &Filter::new().eq("kind", "a")).unwrap(), 1);
    assert_eq!(repo.delete_one("notes", &Filter::new().eq("kind", "z")).unwrap(), 0);
    assert_eq!(repo.count("notes", &Filter::new()).unwrap(), 1);
}
