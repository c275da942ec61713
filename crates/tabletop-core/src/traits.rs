//! Collaborator traits: the seams to the asset library, the fixture
//! library, and the physics simulation.
//!
//! The task-authoring layer never talks to a physics engine or a model
//! loader directly. Everything it needs is expressed here, and tests
//! substitute the mocks from `tabletop-test-utils`.

use crate::error::AssetError;
use crate::geometry::{Pose, Vec3};
use crate::id::{AssetPath, Category, ModelHandle, RegistryName, SiteId, SlotName};
use crate::types::{Arm, ObjectInfo};

// ── Asset factory ──────────────────────────────────────────────────

/// A request to materialize one object model.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetRequest {
    /// Slot the model is created for.
    pub slot: SlotName,
    /// The resolved category.
    pub category: Category,
    /// A pinned instance, when the resolver chose one.
    pub instance: Option<AssetPath>,
    /// Uniform scale factor.
    pub scale: f64,
    /// Registries the model may come from.
    pub registries: Vec<RegistryName>,
}

/// A model built by the asset factory.
#[derive(Clone, Debug, PartialEq)]
pub struct CreatedObject {
    /// Opaque model handle.
    pub handle: ModelHandle,
    /// Metadata about the instance.
    pub info: ObjectInfo,
}

/// Builds object models from resolved categories.
pub trait AssetFactory {
    /// Create one model.
    ///
    /// [`AssetError::NotFound`] is treated like an empty resolution;
    /// [`AssetError::Corrupt`] aborts the episode.
    fn create_object(&mut self, request: &AssetRequest) -> Result<CreatedObject, AssetError>;
}

// ── Fixtures ───────────────────────────────────────────────────────

/// The kinds of fixture a task may ask the layout for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FixtureKind {
    /// The tabletop surface.
    Counter,
    /// A cabinet with a hinged door.
    HingeCabinet,
    /// A drawer.
    Drawer,
    /// A microwave.
    Microwave,
    /// A laptop with a hinged lid.
    Laptop,
}

impl FixtureKind {
    /// Lower-case name used in messages and task configs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::HingeCabinet => "hinge_cabinet",
            Self::Drawer => "drawer",
            Self::Microwave => "microwave",
            Self::Laptop => "laptop",
        }
    }
}

/// A fixture instance bound from the layout.
#[derive(Clone, Debug, PartialEq)]
pub struct FixtureHandle {
    /// Scene name of the fixture; used in every simulation query.
    pub name: String,
    /// What it is.
    pub kind: FixtureKind,
    /// Joints of the fixture's articulation, if any (door hinge, lid).
    pub joints: Vec<String>,
    /// Body name of a button geom (microwave start/stop button), if any.
    pub button: Option<String>,
}

/// Looks up fixtures in the current layout.
pub trait FixtureProvider {
    /// The fixture of `kind` nearest the robot, if the layout has one.
    fn get_fixture(&self, kind: FixtureKind) -> Option<FixtureHandle>;
}

// ── Simulation state ───────────────────────────────────────────────

/// Read-only view of the simulation state at one step.
///
/// Bodies are addressed by slot name (objects) or fixture name.
pub trait SimState {
    /// World pose of a body.
    fn body_pose(&self, body: &str) -> Option<Pose>;

    /// Whether two bodies are in contact.
    fn in_contact(&self, a: &str, b: &str) -> bool;

    /// World position of each gripper.
    fn gripper_positions(&self) -> Vec<(Arm, Vec3)>;

    /// Whether `arm` is grasping `body`.
    fn is_grasping(&self, arm: Arm, body: &str) -> bool;

    /// Whether `arm`'s gripper pads touch `body`.
    fn gripper_contact(&self, arm: Arm, body: &str) -> bool;

    /// World pose of a container's spawn site.
    fn site_pose(&self, body: &str, site: SiteId) -> Option<Pose>;

    /// Signed geometric distance between a container's spawn-site geom
    /// and another body (`<= 0` means touching or penetrating).
    fn site_distance(&self, body: &str, site: SiteId, other: &str) -> Option<f64>;

    /// Normalized door opening of a fixture in `[0, 1]`.
    fn door_state(&self, fixture: &str) -> Option<f64>;

    /// Position of a joint (radians or metres).
    fn joint_position(&self, joint: &str) -> Option<f64>;

    /// A boolean fixture flag such as a microwave's `turned_on`.
    fn fixture_flag(&self, fixture: &str, flag: &str) -> Option<bool>;

    /// Whether `body` lies inside the fixture's interior volume.
    ///
    /// With `partial`, any overlap counts.
    fn inside_fixture(&self, body: &str, fixture: &str, partial: bool) -> bool;
}

/// Mutations allowed at episode reset.
pub trait SimControl: SimState {
    /// Set a fixture's normalized door opening.
    fn set_door_state(&mut self, fixture: &str, value: f64);

    /// Set a joint position.
    fn set_joint_position(&mut self, joint: &str, value: f64);

    /// Set a boolean fixture flag.
    fn set_fixture_flag(&mut self, fixture: &str, flag: &str, value: bool);
}
