//! In-memory Membership concept.
//!
//! A membership links a member to a target (a team) with a role. It starts
//! out invited and must be accepted before it grants anything.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, ErrorCode, StateMachine};
use crate::domain::sync::{error_output, fields_of, into_output, require_str, Fields};
use crate::ports::Concept;

/// Concept name used in synchronization declarations.
pub const MEMBERSHIP: &str = "Membership";

/// Membership lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    Invited,
    Accepted,
    Revoked,
}

impl StateMachine for MembershipStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use MembershipStatus::*;
        matches!(
            (self, target),
            (Invited, Accepted) | (Invited, Revoked) | (Accepted, Revoked)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use MembershipStatus::*;
        match self {
            Invited => vec![Accepted, Revoked],
            Accepted => vec![Revoked],
            Revoked => vec![],
        }
    }
}

#[derive(Debug, Clone)]
struct Membership {
    id: String,
    member: String,
    target: String,
    role: String,
    status: MembershipStatus,
}

impl Membership {
    fn row(&self) -> Fields {
        fields_of(json!({
            "membership": self.id,
            "member": self.member,
            "target": self.target,
            "role": self.role,
            "status": self.status,
        }))
    }
}

#[derive(Default)]
pub struct MembershipConcept {
    memberships: RwLock<Vec<Membership>>,
}

impl MembershipConcept {
    pub fn new() -> Self {
        Self::default()
    }

    /// `invite {member, target, role}` -> `{membership}`
    async fn invite(&self, input: &Fields) -> Result<Fields, DomainError> {
        let member = require_str(input, "member")?;
        let target = require_str(input, "target")?;
        let role = require_str(input, "role")?;

        let mut memberships = self.memberships.write().await;
        let active = memberships.iter().any(|m| {
            m.member == member && m.target == target && m.status != MembershipStatus::Revoked
        });
        if active {
            return Err(DomainError::new(
                ErrorCode::AlreadyExists,
                "Member already belongs to target",
            ));
        }

        let id = Uuid::new_v4().to_string();
        memberships.push(Membership {
            id: id.clone(),
            member,
            target,
            role,
            status: MembershipStatus::Invited,
        });
        Ok(fields_of(json!({ "membership": id })))
    }

    async fn transition(&self, input: &Fields, next: MembershipStatus) -> Result<Fields, DomainError> {
        let id = require_str(input, "membership")?;
        let mut memberships = self.memberships.write().await;
        let membership = memberships
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| DomainError::not_found("Membership"))?;
        membership.status = membership.status.transition_to(next).map_err(|err| {
            DomainError::new(ErrorCode::InvalidStateTransition, err.to_string())
        })?;
        Ok(fields_of(json!({ "membership": id })))
    }

    async fn find(&self, keep: impl Fn(&Membership) -> bool) -> Vec<Fields> {
        self.memberships
            .read()
            .await
            .iter()
            .filter(|m| keep(*m))
            .map(Membership::row)
            .collect()
    }
}

#[async_trait]
impl Concept for MembershipConcept {
    fn name(&self) -> &str {
        MEMBERSHIP
    }

    fn actions(&self) -> &[&'static str] {
        &["invite", "accept", "revoke"]
    }

    fn queries(&self) -> &[&'static str] {
        &["_getByMemberAndTarget", "_getByTarget", "_getByMember"]
    }

    async fn perform(&self, action: &str, input: Fields) -> Fields {
        match action {
            "invite" => into_output(self.invite(&input).await),
            "accept" => into_output(self.transition(&input, MembershipStatus::Accepted).await),
            "revoke" => into_output(self.transition(&input, MembershipStatus::Revoked).await),
            other => error_output(format!("Unknown action '{}'", other)),
        }
    }

    async fn query(&self, name: &str, input: Fields) -> Vec<Fields> {
        let member = require_str(&input, "member").ok();
        let target = require_str(&input, "target").ok();
        match (name, member, target) {
            ("_getByMemberAndTarget", Some(member), Some(target)) => {
                self.find(|m| m.member == member && m.target == target).await
            }
            ("_getByTarget", _, Some(target)) => self.find(|m| m.target == target).await,
            ("_getByMember", Some(member), _) => self.find(|m| m.member == member).await,
            _ => Vec::new(),
        }
    }
}
