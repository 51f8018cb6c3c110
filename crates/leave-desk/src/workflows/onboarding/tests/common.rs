use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, TimeZone, Utc};

use crate::clock::ManualClock;
use crate::memory::InMemoryStore;
use crate::workflows::notifications::Outbox;
use crate::workflows::onboarding::{
    HashError, InvitationDraft, InvitationManager, InvitationRepository, InvitationSettings,
    PasswordHasher, TokenSource, UserInvitation,
};
use crate::workflows::people::{Role, User, UserDirectory, UserId, UserStatus};
use crate::workflows::store::RepositoryError;

pub(super) struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash_password(&self, raw: &str) -> Result<String, HashError> {
        Ok(format!("plain${raw}"))
    }
}

pub(super) struct BrokenHasher;

impl PasswordHasher for BrokenHasher {
    fn hash_password(&self, _raw: &str) -> Result<String, HashError> {
        Err(HashError::Backend("hsm offline".to_string()))
    }
}

/// Hands out scripted byte strings, then repeats the last one.
pub(super) struct ScriptedTokens {
    script: Mutex<VecDeque<u8>>,
}

impl ScriptedTokens {
    pub(super) fn new(fills: &[u8]) -> Self {
        Self {
            script: Mutex::new(fills.iter().copied().collect()),
        }
    }
}

impl TokenSource for ScriptedTokens {
    fn random_bytes(&self, len: usize) -> Vec<u8> {
        let mut script = self.script.lock().expect("script mutex poisoned");
        let fill = if script.len() > 1 {
            script.pop_front().unwrap_or_default()
        } else {
            script.front().copied().unwrap_or_default()
        };
        vec![fill; len]
    }
}

/// Store whose existence check never sees a token, so only the write notices a duplicate.
pub(super) struct BlindTokenCheck(pub(super) Arc<InMemoryStore>);

impl InvitationRepository for BlindTokenCheck {
    fn insert_invitation(
        &self,
        invitation: UserInvitation,
    ) -> Result<UserInvitation, RepositoryError> {
        self.0.insert_invitation(invitation)
    }

    fn update_invitation(
        &self,
        invitation: UserInvitation,
    ) -> Result<UserInvitation, RepositoryError> {
        self.0.update_invitation(invitation)
    }

    fn find_by_token(&self, token: &str) -> Result<Option<UserInvitation>, RepositoryError> {
        self.0.find_by_token(token)
    }

    fn find_unused_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserInvitation>, RepositoryError> {
        self.0.find_unused_by_email(email)
    }

    fn token_exists(&self, _token: &str) -> Result<bool, RepositoryError> {
        Ok(false)
    }

    fn list_invitations(&self) -> Result<Vec<UserInvitation>, RepositoryError> {
        self.0.list_invitations()
    }

    fn redeem(&self, invitation: UserInvitation, user: User) -> Result<User, RepositoryError> {
        self.0.redeem(invitation, user)
    }
}

pub(super) struct Harness {
    pub(super) store: Arc<InMemoryStore>,
    pub(super) outbox: Arc<Outbox>,
    pub(super) clock: Arc<ManualClock>,
    pub(super) manager: InvitationManager<InMemoryStore, InMemoryStore, Outbox>,
    pub(super) admin: User,
    pub(super) lead: User,
}

pub(super) fn harness() -> Harness {
    harness_with(Arc::new(PlainHasher), None)
}

pub(super) fn harness_with(
    hasher: Arc<dyn PasswordHasher>,
    tokens: Option<Arc<dyn TokenSource>>,
) -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let outbox = Arc::new(Outbox::default());
    let clock = Arc::new(ManualClock::on(
        NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
    ));
    let admin = store
        .insert_user(account("ada@example.com", Role::Admin))
        .expect("admin stored");
    let lead = store
        .insert_user(account("lee@example.com", Role::Manager))
        .expect("manager stored");

    let mut manager = InvitationManager::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&outbox),
        hasher,
        InvitationSettings {
            frontend_url: "https://leave.example.com/".to_string(),
            ..InvitationSettings::default()
        },
    )
    .with_clock(clock.clone());
    if let Some(tokens) = tokens {
        manager = manager.with_token_source(tokens);
    }

    Harness {
        store,
        outbox,
        clock,
        manager,
        admin,
        lead,
    }
}

pub(super) fn account(email: &str, role: Role) -> User {
    let now = Utc
        .with_ymd_and_hms(2024, 6, 1, 9, 0, 0)
        .single()
        .expect("valid instant");
    User {
        id: UserId::new(),
        email: email.to_string(),
        first_name: "Existing".to_string(),
        last_name: "Account".to_string(),
        password_hash: "plain$secret".to_string(),
        role,
        department: None,
        status: UserStatus::Approved,
        created_at: now,
        updated_at: now,
    }
}

pub(super) fn draft(email: &str) -> InvitationDraft {
    InvitationDraft {
        email: email.to_string(),
        first_name: "Nia".to_string(),
        last_name: "Newcomer".to_string(),
        role: Role::Staff,
        department: None,
    }
}
