use shared::RegistrationToken;

/// Persisted holder of at most one registration token.
///
/// Both operations are synchronous. Implementations handle their own
/// thread-safety; the service may read from several tasks at once.
pub trait TokenStore: Send + Sync {
    fn registration_token(&self) -> Option<RegistrationToken>;

    /// Replace the stored token. Only the enrollment flow calls this.
    fn set_registration_token(&self, token: RegistrationToken) -> shared::Result<()>;
}
