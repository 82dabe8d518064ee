mod common;

use common::{create_payment, create_user, workbase};
use serde_json::json;
use workbase_core::{EntityErrorKind, Filter, NewUser, NewUserAgent};

fn seed_agents(workbase: &workbase_core::Workbase, count: usize) {
    for index in 0..count {
        workbase
            .user_agents()
            .create(&NewUserAgent {
                user_agent: format!("agent-{index}"),
                browser: Some(if index % 2 == 0 { "firefox" } else { "safari" }.to_string()),
                ..NewUserAgent::default()
            })
            .unwrap();
    }
}

#[test]
fn pages_partition_the_filtered_set() {
    let workbase = workbase();
    seed_agents(&workbase, 7);
    let filter = Filter::new().eq("browser", "firefox");

    let mut seen = Vec::new();
    for page in 0..=1 {
        let result = workbase.user_agents().query(&filter, page, 3).unwrap();
        assert_eq!(result.number_of_items, 4);
        assert_eq!(result.page, page);
        assert_eq!(result.items_per_page, 3);
        assert!(result.results.len() <= 3);
        seen.extend(result.results.into_iter().map(|agent| agent.user_agent));
    }
    assert_eq!(seen, vec!["agent-0", "agent-2", "agent-4", "agent-6"]);
}

#[test]
fn boundary_page_is_empty_and_page_past_it_is_rejected() {
    let workbase = workbase();
    seed_agents(&workbase, 4);

    let last = workbase.user_agents().query(&Filter::new(), 2, 2).unwrap();
    assert!(last.results.is_empty());
    assert_eq!(last.number_of_items, 4);

    let err = workbase
        .user_agents()
        .query(&Filter::new(), 3, 2)
        .unwrap_err();
    assert_eq!(err.kind(), EntityErrorKind::InvalidArgument);
    assert_eq!(err.value(), &json!({"page": 3, "maxPage": 2}));
}

#[test]
fn empty_result_set_is_data_not_found() {
    let workbase = workbase();
    seed_agents(&workbase, 2);

    let err = workbase
        .user_agents()
        .query(&Filter::new().eq("browser", "lynx"), 0, 10)
        .unwrap_err();
    assert_eq!(err.kind(), EntityErrorKind::DataNotFound);
}

#[test]
fn zero_items_per_page_is_invalid_argument() {
    let workbase = workbase();
    seed_agents(&workbase, 1);

    let err = workbase
        .user_agents()
        .query(&Filter::new(), 0, 0)
        .unwrap_err();
    assert_eq!(err.kind(), EntityErrorKind::InvalidArgument);
}

#[test]
fn query_populates_relations_and_strips_revision() {
    let workbase = workbase();
    let payment = create_payment(&workbase, "cus_001");
    workbase
        .users()
        .create(&NewUser {
            customer_payment: Some(payment.id.into()),
            ..NewUser::named("Ada")
        })
        .unwrap();

    let page = workbase
        .lifecycle("User")
        .unwrap()
        .query(&Filter::new(), 0, 10)
        .unwrap();
    let doc = &page.results[0];
    assert!(!doc.contains_key("_rev"));
    let populated = doc["customerPayment"].as_object().unwrap();
    assert_eq!(populated["id"], json!(payment.id.to_string()));
    assert!(!populated.contains_key("_rev"));
}

#[test]
fn contains_filter_matches_list_relations() {
    let workbase = workbase();
    let owner = create_user(&workbase, "Ada");
    let member = create_user(&workbase, "Grace");
    for name in ["alpha", "beta"] {
        workbase
            .workspaces()
            .create(&workbase_core::NewWorkspace {
                members: if name == "beta" { vec![member.id.into()] } else { Vec::new() },
                ..workbase_core::NewWorkspace::new(name, owner.id)
            })
            .unwrap();
    }

    let page = workbase
        .workspaces()
        .query(&Filter::new().contains("members", member.id.to_string()), 0, 10)
        .unwrap();
    assert_eq!(page.number_of_items, 1);
    assert_eq!(page.results[0].name, "beta");
}

#[test]
fn invalid_filter_field_is_invalid_argument() {
    let workbase = workbase();
    seed_agents(&workbase, 1);

    let err = workbase
        .user_agents()
        .query(&Filter::new().eq("browser') OR 1=1 --", "x"), 0, 10)
        .unwrap_err();
    assert_eq!(err.kind(), EntityErrorKind::InvalidArgument);
}
