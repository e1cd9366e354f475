//! Racing task creation against the same parcel.

use super::helpers::{Dispatch, dispatch};
use courier_dispatch::delivery::{domain::DeliveryErrorKind, services::CreateTaskRequest};
use eyre::ensure;
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn only_one_of_two_racing_tasks_claims_a_parcel(dispatch: Dispatch) -> eyre::Result<()> {
    let ada = dispatch.courier("Ada").await?;
    let grace = dispatch.courier("Grace").await?;
    let parcel_id = dispatch.paid_parcel().await?;

    let claims = [ada.person_id(), grace.person_id()].map(|courier_id| {
        let assignment = dispatch.assignment.clone();
        let admin = dispatch.admin;
        tokio::spawn(async move {
            let request = CreateTaskRequest::new(courier_id, [parcel_id], "PICKING_UP");
            assignment.create_task(&admin, request).await
        })
    });
    let mut outcomes = Vec::with_capacity(claims.len());
    for claim in claims {
        outcomes.push(claim.await?);
    }

    ensure!(
        outcomes.iter().filter(|outcome| outcome.is_ok()).count() == 1,
        "exactly one task must win"
    );
    ensure!(outcomes.iter().filter_map(|outcome| outcome.as_ref().err()).all(|err| {
        matches!(err.kind(), DeliveryErrorKind::InvalidState | DeliveryErrorKind::Conflict)
    }));
    let busy = [dispatch.is_busy(&ada).await?, dispatch.is_busy(&grace).await?];
    ensure!(busy.iter().filter(|flag| **flag).count() == 1);
    ensure!(dispatch.parcel(parcel_id).await?.is_assigned());
    Ok(())
}
