//! Exclusively-ownable resource handles and identity-based resource sets.

use std::future::Future;
use std::sync::Arc;

use crate::core::action::{ActionContext, ActionResult, BoxedAction, DefaultActionFn};
use crate::core::task::{TaskHandle, TaskId};
use crate::core::DEFAULT_ACTION_NAME;

#[derive(Default)]
struct OwnerState {
    owner: Option<TaskHandle>,
    current_action_name: Option<String>,
}

/// A named, exclusively-ownable representation of a hardware subsystem or
/// another serialized capability.
///
/// Resources encapsulate low-level hardware (motor controllers, sensors, ...)
/// and are the unit the arbiter serializes access over: at most one action
/// task owns a resource at any instant. External code may freely observe a
/// resource's state ([`is_free`](Self::is_free), [`current_action_name`]
/// (Self::current_action_name)); ownership itself is only ever mutated by the
/// scheduler loop.
///
/// Identity is by reference: sets compare `Arc<Resource>` pointers, and the
/// name is purely diagnostic. Wrap a `Resource` in an `Arc` once at subsystem
/// construction time and share that handle for the process lifetime.
pub struct Resource {
    name: String,
    state: parking_lot::Mutex<OwnerState>,
    default_action: Option<DefaultActionFn>,
}

impl Resource {
    /// Create a resource with no default action.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: parking_lot::Mutex::new(OwnerState::default()),
            default_action: None,
        }
    }

    /// Attach the fallback action scheduled automatically whenever this
    /// resource becomes free.
    ///
    /// The default is submitted with conflict cancellation disabled, so it
    /// silently yields to any action that claimed the resource first. A
    /// default that returns immediately is rescheduled on its own release;
    /// defaults are expected to run until evicted (e.g. a hold-position loop).
    pub fn with_default_action<F, Fut>(mut self, action: F) -> Self
    where
        F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ActionResult> + Send + 'static,
    {
        self.default_action = Some(Arc::new(move |cx| -> BoxedAction { Box::pin(action(cx)) }));
        self
    }

    /// Diagnostic name of this resource.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether no action currently owns this resource.
    pub fn is_free(&self) -> bool {
        self.state.lock().owner.is_none()
    }

    /// Whether an action currently owns this resource.
    pub fn is_in_use(&self) -> bool {
        !self.is_free()
    }

    /// Name of the action currently owning this resource, if any.
    pub fn current_action_name(&self) -> Option<String> {
        self.state.lock().current_action_name.clone()
    }

    /// Identifier of the task currently owning this resource, if any.
    ///
    /// Two resources acquired by one `use_resources` call report the same id.
    pub fn owner_id(&self) -> Option<TaskId> {
        self.state.lock().owner.as_ref().map(TaskHandle::id)
    }

    /// Whether the currently-running action is this resource's default action.
    pub fn is_running_default(&self) -> bool {
        self.state.lock().current_action_name.as_deref() == Some(DEFAULT_ACTION_NAME)
    }

    /// Whether a default action is attached.
    pub fn has_default(&self) -> bool {
        self.default_action.is_some()
    }

    pub(crate) fn default_action(&self) -> Option<DefaultActionFn> {
        self.default_action.clone()
    }

    pub(crate) fn owner_handle(&self) -> Option<TaskHandle> {
        self.state.lock().owner.clone()
    }

    /// Record a new owner. Scheduler loop only.
    pub(crate) fn assign(&self, owner: TaskHandle, action_name: Option<String>) {
        let mut state = self.state.lock();
        state.owner = Some(owner);
        state.current_action_name = action_name;
    }

    /// Clear ownership if `task` is still the recorded owner. Scheduler loop
    /// only. Returns whether the resource was actually freed; a stale release
    /// racing a newer owner is a no-op.
    pub(crate) fn release_if_owned_by(&self, task: TaskId) -> bool {
        let mut state = self.state.lock();
        if state.owner.as_ref().map(TaskHandle::id) != Some(task) {
            return false;
        }
        state.owner = None;
        state.current_action_name = None;
        true
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("current_action_name", &self.current_action_name())
            .field("has_default", &self.has_default())
            .finish()
    }
}

/// An identity-based set of shared [`Resource`] handles.
///
/// Membership compares `Arc` pointers, never names; two distinct resources may
/// share a name. Sets stay small (a handful of subsystems), so storage is a
/// deduplicated vector.
#[derive(Clone, Default)]
pub struct ResourceSet {
    items: Vec<Arc<Resource>>,
}

impl ResourceSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources in the set.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether `resource` (by pointer identity) is a member.
    pub fn contains(&self, resource: &Arc<Resource>) -> bool {
        self.items.iter().any(|member| Arc::ptr_eq(member, resource))
    }

    /// Insert a resource, ignoring duplicates.
    pub fn insert(&mut self, resource: Arc<Resource>) {
        if !self.contains(&resource) {
            self.items.push(resource);
        }
    }

    /// Members of `self` that are not members of `other`.
    pub fn difference(&self, other: &ResourceSet) -> ResourceSet {
        ResourceSet {
            items: self
                .items
                .iter()
                .filter(|member| !other.contains(member))
                .cloned()
                .collect(),
        }
    }

    /// Members of either set, deduplicated.
    pub fn union(&self, other: &ResourceSet) -> ResourceSet {
        let mut merged = self.clone();
        for member in &other.items {
            merged.insert(member.clone());
        }
        merged
    }

    /// Iterate over the members.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.items.iter()
    }

    /// Diagnostic join of the member names, e.g. `"Drive, Intake"`.
    pub fn names(&self) -> String {
        self.items
            .iter()
            .map(|member| member.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromIterator<Arc<Resource>> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = Arc<Resource>>>(iter: I) -> Self {
        let mut set = ResourceSet::new();
        for resource in iter {
            set.insert(resource);
        }
        set
    }
}

impl std::fmt::Debug for ResourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResourceSet {{ {} }}", self.names())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_membership_is_by_identity_not_name() {
        let first = Arc::new(Resource::new("Drive"));
        let second = Arc::new(Resource::new("Drive"));

        let set: ResourceSet = [first.clone()].into_iter().collect();
        assert!(set.contains(&first));
        assert!(!set.contains(&second));
    }

    #[test]
    fn insert_deduplicates() {
        let drive = Arc::new(Resource::new("Drive"));
        let set: ResourceSet = [drive.clone(), drive.clone()].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn difference_and_union() {
        let a = Arc::new(Resource::new("A"));
        let b = Arc::new(Resource::new("B"));
        let c = Arc::new(Resource::new("C"));

        let requested: ResourceSet = [a.clone(), b.clone()].into_iter().collect();
        let held: ResourceSet = [b.clone(), c.clone()].into_iter().collect();

        let fresh = requested.difference(&held);
        assert_eq!(fresh.len(), 1);
        assert!(fresh.contains(&a));

        let all = requested.union(&held);
        assert_eq!(all.len(), 3);
        assert!(all.contains(&c));
    }

    #[test]
    fn names_joins_for_diagnostics() {
        let a = Arc::new(Resource::new("Drive"));
        let b = Arc::new(Resource::new("Intake"));
        let set: ResourceSet = [a, b].into_iter().collect();
        assert_eq!(set.names(), "Drive, Intake");
    }

    #[test]
    fn stale_release_is_ignored() {
        let resource = Resource::new("Drive");
        let newer = TaskHandle::new(TaskId::new(2));
        resource.assign(newer, Some("Newer".into()));

        assert!(!resource.release_if_owned_by(TaskId::new(1)));
        assert_eq!(resource.current_action_name().as_deref(), Some("Newer"));

        assert!(resource.release_if_owned_by(TaskId::new(2)));
        assert!(resource.is_free());
    }
}
