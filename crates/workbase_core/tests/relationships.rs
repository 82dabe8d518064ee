mod common;

use common::{
    counting_workbase, create_payment, create_user, create_workspace, missing_id, workbase,
};
use serde_json::json;
use workbase_core::{EntityErrorKind, NewActivityLog, NewProcessTracking, NewUserAgent, Reference};

#[test]
fn add_many_is_idempotent_and_skips_redundant_writes() {
    let (workbase, repo) = counting_workbase();
    let owner = create_user(&workbase, "Ada");
    let first = create_workspace(&workbase, "Compilers", &owner);
    let second = create_workspace(&workbase, "Languages", &owner);
    let refs = [Reference::from(first.id), Reference::from(second.id), first.id.into()];

    let edit = workbase.users().add_workspaces(owner.id, &refs).unwrap();
    assert!(edit.changed);
    let ids: Vec<_> = edit.entity.workspaces.iter().map(Reference::id).collect();
    assert_eq!(ids, vec![first.id, second.id]);
    assert_eq!(edit.entity.workspaces[0].entity().unwrap().name, "Compilers");

    let updates_before = repo.updates();
    let again = workbase.users().add_workspaces(owner.id, &refs).unwrap();
    assert!(!again.changed);
    assert_eq!(again.entity.workspaces.len(), 2);
    assert_eq!(repo.updates(), updates_before);
}

#[test]
fn add_many_validates_every_candidate() {
    let (workbase, repo) = counting_workbase();
    let owner = create_user(&workbase, "Ada");
    let workspace = create_workspace(&workbase, "Compilers", &owner);
    let ghost = missing_id();
    let updates_before = repo.updates();

    let err = workbase
        .users()
        .add_workspaces(owner.id, &[workspace.id.into(), ghost.into()])
        .unwrap_err();
    assert_eq!(err.kind(), EntityErrorKind::DataNotFound);
    assert_eq!(err.subject(), "Workspace");
    assert_eq!(err.value(), &json!([ghost.to_string()]));
    assert_eq!(repo.updates(), updates_before);
}

#[test]
fn add_many_rejects_missing_owner_before_empty_refs() {
    let workbase = workbase();
    let owner = create_user(&workbase, "Ada");

    let err = workbase.users().add_workspaces(missing_id(), &[]).unwrap_err();
    assert_eq!(err.kind(), EntityErrorKind::DataNotFound);

    let err = workbase.users().add_workspaces(owner.id, &[]).unwrap_err();
    assert_eq!(err.kind(), EntityErrorKind::InvalidArgument);
}

#[test]
fn remove_many_of_absent_ref_is_a_no_op() {
    let (workbase, repo) = counting_workbase();
    let owner = create_user(&workbase, "Ada");
    let member = create_user(&workbase, "Grace");
    let workspace = create_workspace(&workbase, "Compilers", &owner);
    workbase
        .workspaces()
        .add_members(workspace.id, &[member.id.into()])
        .unwrap();

    let updates_before = repo.updates();
    let edit = workbase
        .workspaces()
        .remove_members(workspace.id, &[missing_id().into()])
        .unwrap();
    assert!(!edit.changed);
    assert_eq!(edit.entity.members.len(), 1);
    assert_eq!(edit.entity.members[0].id(), member.id);
    assert_eq!(repo.updates(), updates_before);

    let edit = workbase
        .workspaces()
        .remove_members(workspace.id, &[member.id.into()])
        .unwrap();
    assert!(edit.changed);
    assert!(edit.entity.members.is_empty());
}

#[test]
fn set_single_skips_write_when_unchanged() {
    let (workbase, repo) = counting_workbase();
    let owner = create_user(&workbase, "Ada");
    let payment = create_payment(&workbase, "cus_001");

    let edit = workbase
        .users()
        .set_customer_payment(owner.id, &payment.id.into())
        .unwrap();
    assert!(edit.changed);
    assert_eq!(edit.entity.customer_payment.as_ref().unwrap().id(), payment.id);

    let updates_before = repo.updates();
    let edit = workbase
        .users()
        .set_customer_payment(owner.id, &payment.id.into())
        .unwrap();
    assert!(!edit.changed);
    assert_eq!(repo.updates(), updates_before);
}

#[test]
fn set_single_to_missing_target_is_invalid_argument() {
    let workbase = workbase();
    let owner = create_user(&workbase, "Ada");
    let ghost = missing_id();

    let err = workbase
        .users()
        .set_customer_payment(owner.id, &ghost.into())
        .unwrap_err();
    assert_eq!(err.kind(), EntityErrorKind::InvalidArgument);
    assert_eq!(err.subject(), "CustomerPayment");
    assert_eq!(err.value(), &json!(ghost.to_string()));
}

#[test]
fn remove_single_always_persists() {
    let (workbase, repo) = counting_workbase();
    let owner = create_user(&workbase, "Ada");
    let agent = workbase
        .user_agents()
        .create(&NewUserAgent {
            user_agent: "curl/8.0".to_string(),
            user: Some(owner.id.into()),
            ..NewUserAgent::default()
        })
        .unwrap();

    let edit = workbase.user_agents().remove_user(agent.id).unwrap();
    assert!(edit.changed);
    assert!(edit.entity.user.is_none());

    let updates_before = repo.updates();
    let edit = workbase.user_agents().remove_user(agent.id).unwrap();
    assert!(!edit.changed);
    assert_eq!(repo.updates(), updates_before + 1);
}

#[test]
fn required_and_immutable_relations_cannot_be_cleared() {
    let workbase = workbase();
    let owner = create_user(&workbase, "Ada");
    let log = workbase
        .activity_logs()
        .create(&NewActivityLog::new("login", owner.id))
        .unwrap();
    let lifecycle = workbase.lifecycle("ActivityLog").unwrap();
    let mutator = workbase_core::service::relationship::RelationshipMutator::new(lifecycle);

    let err = mutator
        .remove_single(&log.id.to_string(), "user")
        .unwrap_err();
    assert_eq!(err.kind(), EntityErrorKind::InvalidOperation);

    let workspace = create_workspace(&workbase, "Compilers", &owner);
    let edit = workbase
        .activity_logs()
        .set_workspace(log.id, &workspace.id.into())
        .unwrap();
    assert_eq!(edit.entity.workspace.unwrap().id(), workspace.id);
}

#[test]
fn set_owner_replaces_required_single() {
    let workbase = workbase();
    let owner = create_user(&workbase, "Ada");
    let successor = create_user(&workbase, "Grace");
    let workspace = create_workspace(&workbase, "Compilers", &owner);

    let edit = workbase
        .workspaces()
        .set_owner(workspace.id, &successor.id.into())
        .unwrap();
    assert!(edit.changed);
    let populated = edit.entity.owner.unwrap();
    assert_eq!(populated.entity().unwrap().name, "Grace");
}

#[test]
fn process_tracking_relationship_edits() {
    let workbase = workbase();
    let user = create_user(&workbase, "Ada");
    let log = workbase
        .activity_logs()
        .create(&NewActivityLog::new("import", user.id))
        .unwrap();
    let process = workbase
        .process_trackings()
        .create(&NewProcessTracking::new("import", "running"))
        .unwrap();
    assert!(process.activity_logs.is_empty());

    let edit = workbase
        .process_trackings()
        .add_activity_logs(process.id, &[log.id.into()])
        .unwrap();
    assert_eq!(edit.entity.activity_logs.len(), 1);

    let edit = workbase
        .process_trackings()
        .set_user(process.id, &user.id.into())
        .unwrap();
    assert_eq!(edit.entity.user.unwrap().id(), user.id);

    let edit = workbase
        .process_trackings()
        .remove_activity_logs(process.id, &[log.id.into()])
        .unwrap();
    assert!(edit.entity.activity_logs.is_empty());
}
