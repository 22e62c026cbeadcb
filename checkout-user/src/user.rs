use crate::client::HttpClient;
use crate::error::ProfileError;
use crate::profile::UserBehaviorProfile;
use crate::task::{Task, TaskFuture};
use crate::wait::WaitTime;

pub const CHECKOUT_USER: &str = "CheckoutUser";
pub const CHECKOUT_HOST: &str = "http://localhost:8000";
pub const CHECKOUT_PATH: &str = "/checkout";
pub const CHECKOUT_MIN_WAIT_SECS: f64 = 1.0;
pub const CHECKOUT_MAX_WAIT_SECS: f64 = 2.0;

/// One running instance of a profile, what its tasks operate on.
pub struct HttpUser {
    pub client: HttpClient,
}

impl HttpUser {
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

/// Simulated shopper hitting the checkout endpoint every one to two seconds.
pub fn checkout_user() -> Result<UserBehaviorProfile, ProfileError> {
    UserBehaviorProfile::new(
        CHECKOUT_USER,
        CHECKOUT_HOST,
        WaitTime::between(CHECKOUT_MIN_WAIT_SECS, CHECKOUT_MAX_WAIT_SECS)?,
        [Task::new("checkout", checkout)],
    )
}

pub fn checkout(user: &mut HttpUser) -> TaskFuture<'_> {
    Box::pin(async move { user.client.get(CHECKOUT_PATH).await.map(drop) })
}
