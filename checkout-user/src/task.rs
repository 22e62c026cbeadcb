use crate::error::{ProfileError, RequestError};
use crate::user::HttpUser;
use rand::Rng;
use std::future::Future;
use std::pin::Pin;

pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<(), RequestError>> + Send + 'a>>;

pub type TaskFn = for<'a> fn(&'a mut HttpUser) -> TaskFuture<'a>;

/// One weighted action a simulated user may perform.
#[derive(Clone, Copy)]
pub struct Task {
    name: &'static str,
    weight: u32,
    func: TaskFn,
}

impl Task {
    #[must_use]
    pub fn new(name: &'static str, func: TaskFn) -> Self {
        Self {
            name,
            weight: 1,
            func,
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn weight(&self) -> u32 {
        self.weight
    }

    pub fn run<'a>(&self, user: &'a mut HttpUser) -> TaskFuture<'a> {
        (self.func)(user)
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("weight", &self.weight)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    tasks: Vec<Task>,
    total_weight: u64,
}

impl TaskSet {
    pub fn push(&mut self, task: Task) -> Result<(), ProfileError> {
        if task.weight == 0 {
            return Err(ProfileError::ZeroWeight { name: task.name });
        }
        self.total_weight += u64::from(task.weight);
        self.tasks.push(task);
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Picks a task with probability proportional to its weight.
    pub fn pick<R: Rng>(&self, rng: &mut R) -> Option<&Task> {
        if self.total_weight == 0 {
            return None;
        }
        let mut ticket = rng.gen_range(0..self.total_weight);
        for task in &self.tasks {
            let weight = u64::from(task.weight);
            if ticket < weight {
                return Some(task);
            }
            ticket -= weight;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn noop(_user: &mut HttpUser) -> TaskFuture<'_> {
        Box::pin(async { Ok::<(), RequestError>(()) })
    }

    #[test]
    fn single_task_is_always_picked() {
        let mut set = TaskSet::default();
        set.push(Task::new("checkout", noop)).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert_eq!("checkout", set.pick(&mut rng).unwrap().name());
        }
    }

    #[test]
    fn picks_follow_weights() {
        let mut set = TaskSet::default();
        set.push(Task::new("browse", noop).with_weight(3)).unwrap();
        set.push(Task::new("checkout", noop)).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let browse = (0..4000)
            .filter(|_| set.pick(&mut rng).unwrap().name() == "browse")
            .count();
        assert!((2800..3200).contains(&browse), "{browse}");
    }

    #[test]
    fn empty_and_zero_weight() {
        let mut set = TaskSet::default();
        let mut rng = StdRng::seed_from_u64(9);
        assert!(set.pick(&mut rng).is_none());
        assert_eq!(
            Err(ProfileError::ZeroWeight { name: "idle" }),
            set.push(Task::new("idle", noop).with_weight(0))
        );
        assert!(set.is_empty());
    }
}
