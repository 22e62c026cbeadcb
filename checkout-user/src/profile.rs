use crate::error::ProfileError;
use crate::task::{Task, TaskSet};
use crate::wait::WaitTime;
use hyper::Uri;
use std::sync::Arc;

/// Declaration of one kind of simulated user: where it sends requests,
/// how long it idles between tasks and which tasks it picks from.
/// Immutable once built, shared by every user instance of the class.
#[derive(Debug, Clone)]
pub struct UserBehaviorProfile {
    name: String,
    host: Arc<str>,
    wait_time: WaitTime,
    tasks: TaskSet,
}

impl UserBehaviorProfile {
    pub fn new(
        name: impl Into<String>,
        host: &str,
        wait_time: WaitTime,
        tasks: impl IntoIterator<Item = Task>,
    ) -> Result<Self, ProfileError> {
        let name = name.into();
        let mut set = TaskSet::default();
        for task in tasks {
            set.push(task)?;
        }
        if set.is_empty() {
            return Err(ProfileError::NoTasks { name });
        }
        Ok(Self {
            name,
            host: validate_origin(host)?,
            wait_time,
            tasks: set,
        })
    }

    pub fn with_host(mut self, host: &str) -> Result<Self, ProfileError> {
        self.host = validate_origin(host)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_wait_time(mut self, wait_time: WaitTime) -> Self {
        self.wait_time = wait_time;
        self
    }

    pub fn with_task(mut self, task: Task) -> Result<Self, ProfileError> {
        self.tasks.push(task)?;
        Ok(self)
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn host(&self) -> &Arc<str> {
        &self.host
    }

    #[inline]
    #[must_use]
    pub fn wait_time(&self) -> &WaitTime {
        &self.wait_time
    }

    #[inline]
    #[must_use]
    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }
}

/// Accepts `http://authority` with an optional trailing `/`, nothing else.
fn validate_origin(host: &str) -> Result<Arc<str>, ProfileError> {
    let invalid = |reason| ProfileError::InvalidHost {
        host: host.to_string(),
        reason,
    };
    let uri: Uri = host.parse().map_err(|_| invalid("not a valid uri"))?;
    match uri.scheme_str() {
        Some("http") => {}
        Some(_) => return Err(invalid("only the http scheme is supported")),
        None => return Err(invalid("missing scheme")),
    }
    if uri.authority().is_none() {
        return Err(invalid("missing authority"));
    }
    if !matches!(uri.path(), "" | "/") || uri.query().is_some() {
        return Err(invalid("an origin cannot carry a path or query"));
    }
    Ok(Arc::from(host.trim_end_matches('/')))
}
