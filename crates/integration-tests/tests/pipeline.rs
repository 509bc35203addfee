//! Integration tests for deals, tasks, activities and the dashboard.
//!
//! Requires `CRM_TEST_DATABASE_URL`; run with `cargo test -- --ignored`.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use crm_client::ListQuery;
use crm_core::{ActivityType, DealStage, TaskPriority, TaskStatus};
use crm_integration_tests::{TestContext, unique_email};

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_deal_defaults_and_stage_update() {
    let ctx = TestContext::new().await;
    let (client, auth) = ctx.register("Seller").await;

    let deal = client
        .deals()
        .create(&json!({ "name": "Rocket skates", "amount": "12500.50" }))
        .await
        .expect("create deal");
    assert_eq!(deal.deal.stage, DealStage::New);
    assert_eq!(deal.deal.probability, 10);
    assert_eq!(deal.deal.currency, "USD");
    assert_eq!(deal.deal.amount, Decimal::new(1_250_050, 2));
    assert_eq!(deal.owner.as_ref().map(|u| u.id), Some(auth.user.id));

    let moved = client
        .deals()
        .update_stage(deal.deal.id, DealStage::Negotiation)
        .await
        .expect("update stage");
    assert_eq!(moved.deal.stage, DealStage::Negotiation);
    assert_eq!(moved.deal.amount, deal.deal.amount);

    // Null for a defaulted column keeps what is stored.
    let renamed = client
        .deals()
        .update(
            deal.deal.id,
            &json!({ "name": "Rocket skates v2", "stage": null, "probability": null }),
        )
        .await
        .expect("update with nulls");
    assert_eq!(renamed.deal.stage, DealStage::Negotiation);
    assert_eq!(renamed.deal.probability, 10);
    assert_eq!(renamed.deal.name, "Rocket skates v2");

    let page = client
        .deals()
        .list(&ListQuery::new().stage(DealStage::Negotiation))
        .await
        .expect("filter by stage");
    assert_eq!(page.total, 1);

    let page = client
        .deals()
        .list(&ListQuery::new().stage(DealStage::New))
        .await
        .expect("filter by stage");
    assert_eq!(page.total, 0);

    let page = client
        .deals()
        .list(&ListQuery::new().search("rocket"))
        .await
        .expect("search by name");
    assert_eq!(page.total, 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_deal_validation() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.register("Strict").await;

    let err = client
        .deals()
        .create(&json!({
            "name": "Bad",
            "amount": "lots",
            "stage": "Won-ish",
            "probability": 150,
        }))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(422));
    assert!(!err.field_errors("amount").is_empty());
    assert!(!err.field_errors("stage").is_empty());
    assert!(!err.field_errors("probability").is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_task_assignment_and_completion() {
    let ctx = TestContext::new().await;
    let (client, auth) = ctx.register("Doer").await;
    let (_, teammate) = ctx.register("Teammate").await;

    let tomorrow = (Utc::now() + Duration::days(1)).date_naive();
    let mine = client
        .tasks()
        .create(&json!({ "title": "Call back", "due_date": tomorrow.to_string() }))
        .await
        .expect("create task");
    assert_eq!(mine.task.assigned_to, auth.user.id);
    assert_eq!(mine.task.priority, TaskPriority::Medium);
    assert_eq!(mine.task.status, TaskStatus::Pending);
    assert_eq!(mine.assignee.as_ref().map(|u| u.id), Some(auth.user.id));

    let delegated = client
        .tasks()
        .create(&json!({
            "title": "Send contract",
            "due_date": tomorrow.to_string(),
            "priority": "high",
            "assigned_to": teammate.user.id,
        }))
        .await
        .expect("create delegated task");
    assert_eq!(delegated.task.assigned_to, teammate.user.id);

    // Nulls on update keep the current assignee, priority and status.
    let renamed = client
        .tasks()
        .update(
            delegated.task.id,
            &json!({
                "title": "Send signed contract",
                "assigned_to": null,
                "priority": null,
                "status": null,
            }),
        )
        .await
        .expect("update task");
    assert_eq!(renamed.task.assigned_to, teammate.user.id);
    assert_eq!(renamed.task.priority, TaskPriority::High);
    assert_eq!(renamed.task.status, TaskStatus::Pending);
    assert_eq!(renamed.task.title, "Send signed contract");

    let page = client
        .tasks()
        .list(&ListQuery::new().assigned_to(teammate.user.id))
        .await
        .expect("filter by assignee");
    assert_eq!(page.total, 1);

    let done = client.tasks().complete(mine.task.id).await.expect("complete");
    assert_eq!(done.task.status, TaskStatus::Completed);

    let page = client
        .tasks()
        .list(&ListQuery::new().status("completed"))
        .await
        .expect("filter by status");
    assert_eq!(page.total, 1);

    // Unknown labels filter to nothing instead of failing.
    let page = client
        .tasks()
        .list(&ListQuery::new().status("someday"))
        .await
        .expect("filter by unknown status");
    assert_eq!(page.total, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_activities_filter_and_delete() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.register("Logger").await;

    let contact = client
        .contacts()
        .create(&json!({
            "first_name": "Pat",
            "last_name": "Prospect",
            "email": unique_email("pat"),
        }))
        .await
        .expect("create contact");
    let contact_id = contact.contact.id.as_i64();

    let call = client
        .activities()
        .create(&json!({
            "type": "call",
            "title": "Intro call",
            "duration": 30,
            "participants": ["Pat", "Sam"],
            "related_to_type": "contact",
            "related_to_id": contact_id,
        }))
        .await
        .expect("create call");
    assert_eq!(call.activity.kind, ActivityType::Call);
    assert!(!call.activity.completed);

    client
        .activities()
        .create(&json!({ "type": "note", "title": "Prefers email" }))
        .await
        .expect("create note");

    let calls = client
        .activities()
        .list(&ListQuery::new().kind("call"))
        .await
        .expect("filter by type");
    assert_eq!(calls.total, 1);

    let related = client
        .activities()
        .list(&ListQuery::new().related_to("contact", contact_id))
        .await
        .expect("filter by related record");
    assert_eq!(related.total, 1);

    client
        .activities()
        .delete(call.activity.id)
        .await
        .expect("delete activity");
    let all = client
        .activities()
        .list(&ListQuery::new())
        .await
        .expect("list");
    assert_eq!(all.total, 1);

    let err = client
        .activities()
        .create(&json!({ "type": "lunch", "title": "Nope" }))
        .await
        .unwrap_err();
    assert!(!err.field_errors("type").is_empty());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_dashboard_aggregates_caller_data() {
    let ctx = TestContext::new().await;
    let (client, _) = ctx.register("Manager").await;
    let (other, _) = ctx.register("Other").await;

    let empty = client.dashboard().await.expect("empty dashboard");
    assert_eq!(empty.total_deals, 0);
    assert_eq!(empty.total_deals_value, Decimal::ZERO);
    assert!(empty.recent_activities.is_empty());

    client
        .companies()
        .create(&json!({ "name": "Dash Co" }))
        .await
        .expect("create company");
    for (name, amount, stage) in [
        ("Won A", "1000", "Closed Won"),
        ("Won B", "500.25", "Closed Won"),
        ("Open", "250", "Qualification"),
    ] {
        client
            .deals()
            .create(&json!({ "name": name, "amount": amount, "stage": stage }))
            .await
            .expect("create deal");
    }
    other
        .deals()
        .create(&json!({ "name": "Not mine", "amount": "99999", "stage": "Closed Won" }))
        .await
        .expect("create other deal");

    let yesterday = (Utc::now() - Duration::days(1)).date_naive();
    client
        .tasks()
        .create(&json!({ "title": "Late", "due_date": yesterday.to_string() }))
        .await
        .expect("create overdue task");
    let finished = client
        .tasks()
        .create(&json!({ "title": "Also late", "due_date": yesterday.to_string() }))
        .await
        .expect("create task");
    client
        .tasks()
        .complete(finished.task.id)
        .await
        .expect("complete task");

    for n in 0..6 {
        client
            .activities()
            .create(&json!({ "type": "email", "title": format!("Follow-up {n}") }))
            .await
            .expect("create activity");
    }

    let stats = client.dashboard().await.expect("dashboard");
    assert_eq!(stats.total_companies, 1);
    assert_eq!(stats.total_contacts, 0);
    assert_eq!(stats.total_deals, 3);
    assert_eq!(stats.total_deals_value, Decimal::new(175_025, 2));
    assert_eq!(stats.won_deals, 2);
    assert_eq!(stats.won_deals_value, Decimal::new(150_025, 2));
    assert_eq!(stats.open_tasks, 1);
    assert_eq!(stats.overdue_tasks, 1);
    assert_eq!(stats.activities_this_week, 6);
    assert_eq!(stats.recent_activities.len(), 5);

    let won = stats
        .deals_by_stage
        .iter()
        .find(|s| s.stage == DealStage::ClosedWon)
        .expect("closed won bucket");
    assert_eq!(won.count, 2);
}
