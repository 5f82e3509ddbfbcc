//! End-to-end workflow tests over the in-memory ports

use domain_claims::{
    AuditAction, ClaimError, ClaimStatus, NewDetailLine, Recipient, TemplateKind, WorkflowConfig,
};
use test_utils::{
    assert_audit_actions, assert_bulk_outcome, assert_error_kind, assert_status, assert_totals_consistent,
    ClaimsWorld, DetailLinesBuilder, IdFixtures, TemporalFixtures, WORLD_HOURLY_RATE,
};

#[tokio::test]
async fn test_submit_approve_pay_then_cancel_is_invalid() {
    let mut world = ClaimsWorld::new();

    let draft = world.draft_claim().await;
    assert_status(&draft, ClaimStatus::Draft);
    assert_eq!(draft.total_working_hours, 12);
    assert_totals_consistent(&draft, WORLD_HOURLY_RATE);

    world.tick();
    let submitted = world.service.submit_claim(draft.id, world.owner.id).await.unwrap();
    assert_status(&submitted.claim, ClaimStatus::PendingApproval);
    let intent = submitted.notification.expect("submit notifies the project manager");
    assert_eq!(intent.template, TemplateKind::Submitted);
    assert_eq!(intent.recipients, vec![Recipient::ProjectManager(world.project_id)]);
    assert_eq!(
        world.dispatcher().resolve_recipients(&intent.recipients).await.unwrap(),
        vec![world.manager.email.clone()]
    );

    world.tick();
    let approved = world.service.approve_claim(draft.id, world.manager.id, None).await.unwrap();
    assert_status(&approved.claim, ClaimStatus::Approved);

    world.tick();
    let outcome = world.service.pay_claims(&[draft.id], world.finance.id).await;
    assert_bulk_outcome(&outcome, &[draft.id], &[]);
    assert_status(&world.service.get_claim(draft.id).await.unwrap(), ClaimStatus::Paid);

    let cancel = world.service.cancel_claim(draft.id, world.owner.id).await;
    assert_error_kind(&cancel, "invalid_transition");

    let trail = world.service.list_audit_trail(draft.id).await.unwrap();
    assert_audit_actions(
        &trail,
        &[AuditAction::Create, AuditAction::Submit, AuditAction::Approve, AuditAction::Paid],
    );

    let templates: Vec<TemplateKind> = world.drain_notifications().iter().map(|i| i.template).collect();
    assert_eq!(
        templates,
        vec![TemplateKind::Submitted, TemplateKind::Approved, TemplateKind::Paid]
    );
}

#[tokio::test]
async fn test_return_keeps_remark_and_blank_return_changes_nothing() {
    let world = ClaimsWorld::new();
    let first = world.pending_claim().await;

    world.tick();
    let returned = world
        .service
        .return_claim(first.id, world.manager.id, "needs detail")
        .await
        .unwrap();
    assert_status(&returned.claim, ClaimStatus::Draft);
    assert_eq!(returned.claim.review_remark.as_deref(), Some("needs detail"));
    let intent = returned.notification.unwrap();
    assert_eq!(intent.template, TemplateKind::Returned);
    assert_eq!(intent.recipients, vec![Recipient::ClaimOwner(world.owner.id)]);
    assert_eq!(intent.remark.as_deref(), Some("needs detail"));

    let second = world.pending_claim().await;
    let blank = world.service.return_claim(second.id, world.manager.id, "   ").await;
    assert!(matches!(blank, Err(ClaimError::MissingRequiredRemark(_))));
    assert_status(&world.service.get_claim(second.id).await.unwrap(), ClaimStatus::PendingApproval);
    assert_audit_actions(
        &world.service.list_audit_trail(second.id).await.unwrap(),
        &[AuditAction::Create, AuditAction::Submit],
    );

    // The returned claim can be edited and resubmitted; resubmission clears the remark
    world.tick();
    let lines = DetailLinesBuilder::new().hours(3).with_remark("hotfix").build();
    let edited = world
        .service
        .update_claim(first.id, world.owner.id, &lines, None)
        .await
        .unwrap();
    assert_eq!(edited.total_working_hours, 3);
    let resubmitted = world.service.submit_claim(first.id, world.owner.id).await.unwrap();
    assert_status(&resubmitted.claim, ClaimStatus::PendingApproval);
    assert!(resubmitted.claim.review_remark.is_none());
}

#[tokio::test]
async fn test_owner_may_not_review_own_claim() {
    let world = ClaimsWorld::new();

    // The manager also works overtime on the project they manage
    let own = world.draft_claim_for(world.manager.id).await;
    world.service.submit_claim(own.id, world.manager.id).await.unwrap();

    let approve = world.service.approve_claim(own.id, world.manager.id, None).await;
    assert_error_kind(&approve, "unauthorized");
    let reject = world.service.reject_claim(own.id, world.manager.id, Some("no")).await;
    assert_error_kind(&reject, "unauthorized");
    assert_status(&world.service.get_claim(own.id).await.unwrap(), ClaimStatus::PendingApproval);

    let by_finance = world.service.approve_claim(own.id, world.finance.id, None).await.unwrap();
    assert_status(&by_finance.claim, ClaimStatus::Approved);
}

#[tokio::test]
async fn test_finance_owner_may_not_pay_or_return_own_claim() {
    let world = ClaimsWorld::new();
    let own = world.draft_claim_for(world.finance_owner.id).await;
    world.service.submit_claim(own.id, world.finance_owner.id).await.unwrap();

    let self_return = world.service.return_claim(own.id, world.finance_owner.id, "redo").await;
    assert_error_kind(&self_return, "unauthorized");
    let self_approve = world.service.approve_claim(own.id, world.finance_owner.id, None).await;
    assert_error_kind(&self_approve, "unauthorized");

    world.service.approve_claim(own.id, world.manager.id, None).await.unwrap();

    let self_pay = world.service.pay_claims(&[own.id], world.finance_owner.id).await;
    assert_bulk_outcome(&self_pay, &[], &[(own.id, "unauthorized")]);
    assert_status(&world.service.get_claim(own.id).await.unwrap(), ClaimStatus::Approved);

    let paid = world.service.pay_claims(&[own.id], world.finance.id).await;
    assert_bulk_outcome(&paid, &[own.id], &[]);
    assert_status(&world.service.get_claim(own.id).await.unwrap(), ClaimStatus::Paid);

    assert_audit_actions(
        &world.service.list_audit_trail(own.id).await.unwrap(),
        &[AuditAction::Create, AuditAction::Submit, AuditAction::Approve, AuditAction::Paid],
    );
}

#[tokio::test]
async fn test_manager_may_not_return_own_claim() {
    let world = ClaimsWorld::new();
    let own = world.draft_claim_for(world.manager.id).await;
    world.service.submit_claim(own.id, world.manager.id).await.unwrap();

    let self_return = world.service.return_claim(own.id, world.manager.id, "redo").await;
    assert_error_kind(&self_return, "unauthorized");
    assert_status(&world.service.get_claim(own.id).await.unwrap(), ClaimStatus::PendingApproval);
    assert!(world.service.get_claim(own.id).await.unwrap().review_remark.is_none());

    let by_finance = world.service.return_claim(own.id, world.finance.id, "redo").await.unwrap();
    assert_status(&by_finance.claim, ClaimStatus::Draft);
}

#[tokio::test]
async fn test_approver_scope_is_limited_to_managed_projects() {
    let world = ClaimsWorld::new();
    let pending = world.pending_claim().await;

    let outsider = world.service.approve_claim(pending.id, world.other_manager.id, None).await;
    assert_error_kind(&outsider, "unauthorized");

    let peer = world.service.approve_claim(pending.id, world.approver_owner.id, None).await;
    assert_error_kind(&peer, "unauthorized");

    let staff = world.service.approve_claim(pending.id, world.owner.id, None).await;
    assert_error_kind(&staff, "unauthorized");

    world.service.approve_claim(pending.id, world.manager.id, None).await.unwrap();
}

#[tokio::test]
async fn test_pay_many_reports_partial_success() {
    let world = ClaimsWorld::new();
    let approved = world.approved_claim().await;
    let pending = world.pending_claim().await;
    let draft = world.draft_claim().await;

    let outcome = world
        .service
        .pay_claims(&[approved.id, draft.id, pending.id], world.finance.id)
        .await;

    assert_bulk_outcome(
        &outcome,
        &[approved.id, pending.id],
        &[(draft.id, "invalid_transition")],
    );
    assert!(outcome.failure_for(draft.id).unwrap().reason().contains("draft"));
    assert_status(&world.service.get_claim(draft.id).await.unwrap(), ClaimStatus::Draft);
    assert_audit_actions(
        &world.service.list_audit_trail(draft.id).await.unwrap(),
        &[AuditAction::Create],
    );
}

#[tokio::test]
async fn test_bulk_by_non_finance_fails_per_item() {
    let world = ClaimsWorld::new();
    let approved = world.approved_claim().await;
    let unknown = IdFixtures::unknown_claim_id();

    let outcome = world.service.pay_claims(&[approved.id, unknown], world.manager.id).await;

    assert_bulk_outcome(
        &outcome,
        &[],
        &[(approved.id, "unauthorized"), (unknown, "not_found")],
    );
    assert_status(&world.service.get_claim(approved.id).await.unwrap(), ClaimStatus::Approved);
}

#[tokio::test]
async fn test_approve_many_processes_duplicates_once() {
    let world = ClaimsWorld::new();
    let a = world.pending_claim().await;
    let b = world.pending_claim().await;

    let outcome = world
        .service
        .approve_many(&[a.id, a.id, b.id], world.manager.id)
        .await;

    assert_bulk_outcome(&outcome, &[a.id, b.id], &[]);
    assert_eq!(outcome.total(), 2);
    assert_audit_actions(
        &world.service.list_audit_trail(a.id).await.unwrap(),
        &[AuditAction::Create, AuditAction::Submit, AuditAction::Approve],
    );
}

#[tokio::test]
async fn test_each_transition_appends_exactly_one_causal_entry() {
    let world = ClaimsWorld::new();
    let before = world.pending_claim().await;
    let trail_before = world.service.list_audit_trail(before.id).await.unwrap();

    world.tick();
    let after = world
        .service
        .reject_claim(before.id, world.finance.id, Some("duplicate of last week"))
        .await
        .unwrap();

    let trail = world.service.list_audit_trail(before.id).await.unwrap();
    assert_eq!(trail.len(), trail_before.len() + 1);
    let entry = trail.last().unwrap();
    assert_eq!(entry.action, AuditAction::Reject);
    assert_eq!(entry.actor_id, world.finance.id);
    assert_eq!(entry.note.as_deref(), Some("duplicate of last week"));
    assert!(entry.recorded_at >= before.updated_at);
    assert_eq!(after.claim.version, before.version + 1);
}

#[tokio::test]
async fn test_audit_failure_does_not_roll_back_the_transition() {
    let world = ClaimsWorld::new();
    let draft = world.draft_claim().await;

    world.audit.set_failing(true);
    let submitted = world.service.submit_claim(draft.id, world.owner.id).await.unwrap();
    assert_status(&submitted.claim, ClaimStatus::PendingApproval);
    assert!(submitted.notification.is_some());

    world.audit.set_failing(false);
    assert_status(&world.service.get_claim(draft.id).await.unwrap(), ClaimStatus::PendingApproval);
    assert_audit_actions(
        &world.service.list_audit_trail(draft.id).await.unwrap(),
        &[AuditAction::Create],
    );
}

#[tokio::test]
async fn test_cancel_sends_nothing() {
    let mut world = ClaimsWorld::new();
    let pending = world.pending_claim().await;
    world.drain_notifications();

    let cancelled = world.service.cancel_claim(pending.id, world.owner.id).await.unwrap();
    assert_status(&cancelled.claim, ClaimStatus::Cancelled);
    assert!(cancelled.notification.is_none());
    assert!(world.drain_notifications().is_empty());

    let by_other = world.service.cancel_claim(pending.id, world.manager.id).await;
    assert_error_kind(&by_other, "invalid_transition");
}

#[tokio::test]
async fn test_only_the_owner_cancels_or_updates() {
    let world = ClaimsWorld::new();
    let draft = world.draft_claim().await;

    let cancel = world.service.cancel_claim(draft.id, world.manager.id).await;
    assert_error_kind(&cancel, "unauthorized");

    let update = world
        .service
        .update_claim(draft.id, world.manager.id, &TemporalFixtures::eight_plus_four(), None)
        .await;
    assert_error_kind(&update, "unauthorized");
}

#[tokio::test]
async fn test_approved_claims_can_still_be_rejected() {
    let mut world = ClaimsWorld::new();
    let approved = world.approved_claim().await;
    world.drain_notifications();

    let rejected = world
        .service
        .reject_claim(approved.id, world.finance.id, None)
        .await
        .unwrap();
    assert_status(&rejected.claim, ClaimStatus::Rejected);

    let sent = world.drain_notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].template, TemplateKind::Rejected);
    assert_eq!(sent[0].recipients, vec![Recipient::ClaimOwner(world.owner.id)]);
}

#[tokio::test]
async fn test_approval_notifies_owner_and_finance() {
    let world = ClaimsWorld::new();
    let pending = world.pending_claim().await;

    let approved = world.service.approve_claim(pending.id, world.manager.id, None).await.unwrap();
    let intent = approved.notification.unwrap();
    assert_eq!(intent.template, TemplateKind::Approved);

    let mut expected = vec![
        world.owner.email.clone(),
        world.finance.email.clone(),
        world.finance_owner.email.clone(),
    ];
    expected.sort();
    assert_eq!(
        world.dispatcher().resolve_recipients(&intent.recipients).await.unwrap(),
        expected
    );
}

#[tokio::test]
async fn test_create_validates_input() {
    let world = ClaimsWorld::new();

    let empty = world.service.create_claim(world.owner.id, world.project_id, &[], None).await;
    assert_error_kind(&empty, "validation_failed");

    let reversed = world
        .service
        .create_claim(world.owner.id, world.project_id, &[TemporalFixtures::reversed_line()], None)
        .await;
    assert_error_kind(&reversed, "validation_failed");

    let not_enrolled = world
        .service
        .create_claim(world.owner.id, world.other_project_id, &TemporalFixtures::eight_plus_four(), None)
        .await;
    assert_error_kind(&not_enrolled, "validation_failed");

    let admin = world
        .service
        .create_claim(world.admin.id, world.project_id, &TemporalFixtures::eight_plus_four(), None)
        .await;
    assert_error_kind(&admin, "unauthorized");

    let stranger = world
        .service
        .create_claim(IdFixtures::unknown_staff_id(), world.project_id, &TemporalFixtures::eight_plus_four(), None)
        .await;
    assert_error_kind(&stranger, "not_found");

    assert!(world.service.list_claims_by_owner(world.owner.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remark_length_is_limited() {
    let world = ClaimsWorld::with_config(WorkflowConfig { remark_max_len: 20 });
    let long_line = vec![NewDetailLine::new(
        TemporalFixtures::reference_now(),
        TemporalFixtures::reference_now(),
    )
    .with_remark("far too long for the limit")];

    let create = world
        .service
        .create_claim(world.owner.id, world.project_id, &long_line, None)
        .await;
    assert_error_kind(&create, "validation_failed");

    let pending = world.pending_claim().await;
    let reject = world
        .service
        .reject_claim(pending.id, world.manager.id, Some("this remark is much too long"))
        .await;
    assert_error_kind(&reject, "validation_failed");
    assert_status(&world.service.get_claim(pending.id).await.unwrap(), ClaimStatus::PendingApproval);
}

#[tokio::test]
async fn test_update_replaces_lines_and_recomputes_totals() {
    let world = ClaimsWorld::new();
    let draft = world.draft_claim().await;

    world.tick();
    let lines = DetailLinesBuilder::new()
        .hours(2)
        .span(chrono::Duration::minutes(90))
        .build();
    let updated = world
        .service
        .update_claim(draft.id, world.owner.id, &lines, Some("  weekend  "))
        .await
        .unwrap();

    assert_eq!(updated.details.len(), 2);
    assert_eq!(updated.total_working_hours, 3);
    assert_totals_consistent(&updated, WORLD_HOURLY_RATE);
    assert_eq!(updated.remark.as_deref(), Some("weekend"));
    assert!(updated.updated_at > draft.updated_at);

    world.service.submit_claim(draft.id, world.owner.id).await.unwrap();
    let late = world.service.update_claim(draft.id, world.owner.id, &lines, None).await;
    assert_error_kind(&late, "invalid_transition");
}

#[tokio::test]
async fn test_unknown_claim_is_not_found() {
    let world = ClaimsWorld::new();
    let missing = IdFixtures::unknown_claim_id();

    assert_error_kind(&world.service.submit_claim(missing, world.owner.id).await, "not_found");
    assert_error_kind(&world.service.list_audit_trail(missing).await, "not_found");
}

#[tokio::test]
async fn test_download_is_audited_per_claim() {
    let world = ClaimsWorld::new();
    let a = world.approved_claim().await;
    let b = world.pending_claim().await;

    let export = world
        .service
        .download_claims(&[a.id, b.id, a.id], world.finance.id)
        .await
        .unwrap();

    assert_eq!(export.rows.len(), 2);
    assert_eq!(export.rows[0].staff_name, world.owner.name);
    assert_eq!(export.rows[0].project_name, "Apollo");
    assert_eq!(export.grand_total_hours, 24);
    assert_eq!(export.grand_total_amount, 24 * WORLD_HOURLY_RATE);
    assert_status(&world.service.get_claim(a.id).await.unwrap(), ClaimStatus::Approved);

    let trail = world.service.list_audit_trail(b.id).await.unwrap();
    assert_eq!(trail.last().unwrap().action, AuditAction::Download);
    assert_eq!(trail.last().unwrap().actor_id, world.finance.id);
}

#[tokio::test]
async fn test_download_rules() {
    let world = ClaimsWorld::new();
    let a = world.approved_claim().await;

    let by_staff = world.service.download_claims(&[a.id], world.owner.id).await;
    assert_error_kind(&by_staff, "unauthorized");

    let with_missing = world
        .service
        .download_claims(&[a.id, IdFixtures::unknown_claim_id()], world.admin.id)
        .await;
    assert_error_kind(&with_missing, "not_found");

    let actions: Vec<AuditAction> = world
        .service
        .list_audit_trail(a.id)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect();
    assert!(!actions.contains(&AuditAction::Download));
}

#[tokio::test]
async fn test_pending_lists_follow_reviewer_scope() {
    let world = ClaimsWorld::new();
    let pending = world.pending_claim().await;
    world.draft_claim().await;

    let mine = world.service.list_pending_for_approver(world.manager.id).await.unwrap();
    assert_eq!(mine.iter().map(|c| c.id).collect::<Vec<_>>(), vec![pending.id]);

    assert!(world
        .service
        .list_pending_for_approver(world.other_manager.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(world.service.list_pending_for_approver(world.finance.id).await.unwrap().len(), 1);

    let staff = world.service.list_pending_for_approver(world.owner.id).await;
    assert_error_kind(&staff, "unauthorized");
}

#[tokio::test]
async fn test_full_audit_log_is_admin_only() {
    let world = ClaimsWorld::new();
    world.pending_claim().await;
    world.draft_claim().await;

    let all = world.service.list_all_audit(world.admin.id).await.unwrap();
    assert_eq!(all.len(), 3);

    let by_finance = world.service.list_all_audit(world.finance.id).await;
    assert_error_kind(&by_finance, "unauthorized");
}

#[tokio::test]
async fn test_reminders_group_pending_claims_by_manager() {
    let mut world = ClaimsWorld::new();
    let first = world.pending_claim().await;
    let second = world.pending_claim().await;
    world.draft_claim().await;
    world.drain_notifications();

    let reminders = world.service.pending_reminders().await.unwrap();
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].template, TemplateKind::PendingReminder);
    assert_eq!(reminders[0].recipients, vec![Recipient::Approver(world.manager.id)]);
    let ids: Vec<_> = reminders[0].claims.iter().map(|c| c.claim_id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    assert_eq!(world.service.send_pending_reminders().await.unwrap(), 1);
    let queued = world.drain_notifications();
    assert_eq!(queued, reminders);
}

#[tokio::test]
async fn test_no_reminders_without_pending_claims() {
    let world = ClaimsWorld::new();
    world.draft_claim().await;
    assert_eq!(world.service.send_pending_reminders().await.unwrap(), 0);
}
