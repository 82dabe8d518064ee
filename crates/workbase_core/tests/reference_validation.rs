mod common;

use common::{create_user, missing_id, workbase};
use serde_json::json;
use workbase_core::model::user::USER;
use workbase_core::service::reference::{all_exist, CollectionProbe, ExistenceCheck};
use workbase_core::EntityErrorKind;

#[test]
fn exists_sees_only_active_documents() {
    let workbase = workbase();
    let user = create_user(&workbase, "Ada");

    assert!(workbase.users().exists(user.id).unwrap());
    assert!(!workbase.users().exists(missing_id()).unwrap());

    workbase.users().delete_by_id(user.id).unwrap();
    assert!(!workbase.users().exists(user.id).unwrap());
}

#[test]
fn all_exist_is_true_iff_every_id_is_found() {
    let workbase = workbase();
    let ada = create_user(&workbase, "Ada");
    let grace = create_user(&workbase, "Grace");

    assert!(workbase.users().all_exist(&[ada.id, grace.id]).unwrap());
    assert!(workbase.users().all_exist(&[]).unwrap());
}

#[test]
fn all_exist_reports_missing_ids_in_input_order() {
    let workbase = workbase();
    let ada = create_user(&workbase, "Ada");
    let first = missing_id();
    let second = missing_id();

    let err = workbase
        .users()
        .all_exist(&[second, ada.id, first, second])
        .unwrap_err();
    assert_eq!(err.kind(), EntityErrorKind::DataNotFound);
    assert_eq!(err.subject(), "User");
    assert_eq!(
        err.value(),
        &json!([second.to_string(), first.to_string()])
    );
}

#[test]
fn collection_probe_checks_the_target_collection() {
    let workbase = workbase();
    let ada = create_user(&workbase, "Ada");
    let probe = CollectionProbe::new(workbase.repository(), &USER);

    assert_eq!(probe.subject(), "User");
    assert!(probe.exists(&ada.id.to_string()).unwrap());
    assert!(all_exist(&[ada.id.to_string()], &probe).unwrap());

    let found = probe
        .find_existing(&[ada.id.to_string(), missing_id().to_string()])
        .unwrap();
    assert_eq!(found, vec![ada.id.to_string()]);
}
