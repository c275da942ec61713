//! Mock asset factory and fixture provider.
//!
//! - [`MockAssetFactory`]: builds [`ObjectInfo`] from a catalog, records
//!   every request, and can be told to fail for chosen categories.
//! - [`MockFixtures`]: a fixed list of fixture handles.

use indexmap::{IndexMap, IndexSet};

use tabletop_catalog::Catalog;
use tabletop_core::{
    AssetError, AssetFactory, AssetRequest, Category, CreatedObject, FixtureHandle, FixtureKind,
    FixtureProvider, ModelHandle, ObjectInfo, SpawnSite,
};

use crate::kitchen::kitchen_sites;

/// Radius given to receptacles (categories tagged `receptacle`).
pub const RECEPTACLE_RADIUS: f64 = 0.15;

/// Radius given to everything else.
pub const OBJECT_RADIUS: f64 = 0.04;

/// Builds models from a catalog without touching any files.
pub struct MockAssetFactory {
    catalog: Catalog,
    sites: IndexMap<Category, Vec<SpawnSite>>,
    missing: IndexSet<Category>,
    corrupt: IndexSet<Category>,
    requests: Vec<AssetRequest>,
    next_handle: u64,
}

impl MockAssetFactory {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            sites: IndexMap::new(),
            missing: IndexSet::new(),
            corrupt: IndexSet::new(),
            requests: Vec::new(),
            next_handle: 1,
        }
    }

    /// A factory over `catalog` with the kitchen container sites.
    pub fn kitchen(catalog: Catalog) -> Self {
        let mut factory = Self::new(catalog);
        factory.sites = kitchen_sites();
        factory
    }

    pub fn with_sites(mut self, category: &str, sites: Vec<SpawnSite>) -> Self {
        self.sites.insert(Category::from(category), sites);
        self
    }

    /// Report [`AssetError::NotFound`] for `category`.
    pub fn missing(mut self, category: &str) -> Self {
        self.missing.insert(Category::from(category));
        self
    }

    /// Report [`AssetError::Corrupt`] for `category`.
    pub fn corrupt(mut self, category: &str) -> Self {
        self.corrupt.insert(Category::from(category));
        self
    }

    /// Every request seen so far.
    pub fn requests(&self) -> &[AssetRequest] {
        &self.requests
    }

    pub fn clear_requests(&mut self) {
        self.requests.clear();
    }
}

impl AssetFactory for MockAssetFactory {
    fn create_object(&mut self, request: &AssetRequest) -> Result<CreatedObject, AssetError> {
        self.requests.push(request.clone());
        if self.corrupt.contains(&request.category) {
            return Err(AssetError::Corrupt {
                path: request
                    .instance
                    .as_ref()
                    .map_or_else(|| request.category.to_string(), |p| p.to_string()),
                reason: "mesh failed to parse".into(),
            });
        }
        let record = match self.catalog.get(request.category.as_str()) {
            Some(r) if !self.missing.contains(&request.category) => r,
            _ => {
                return Err(AssetError::NotFound {
                    category: request.category.clone(),
                })
            }
        };
        let radius = if record.has_group("receptacle") {
            RECEPTACLE_RADIUS
        } else {
            OBJECT_RADIUS
        };
        let handle = ModelHandle(self.next_handle);
        self.next_handle += 1;
        Ok(CreatedObject {
            handle,
            info: ObjectInfo {
                category: record.name.clone(),
                groups: record.groups.clone(),
                instance: request.instance.clone(),
                horizontal_radius: radius * request.scale,
                sites: self
                    .sites
                    .get(&request.category)
                    .cloned()
                    .unwrap_or_default(),
            },
        })
    }
}

/// A fixed set of fixtures.
#[derive(Clone, Debug, Default)]
pub struct MockFixtures {
    fixtures: Vec<FixtureHandle>,
}

impl MockFixtures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter, hinged cabinet, drawer, microwave and laptop.
    pub fn kitchen() -> Self {
        let handle = |name: &str, kind, joints: &[&str], button: Option<&str>| FixtureHandle {
            name: name.to_owned(),
            kind,
            joints: joints.iter().map(|j| (*j).to_owned()).collect(),
            button: button.map(str::to_owned),
        };
        Self {
            fixtures: vec![
                handle("counter", FixtureKind::Counter, &[], None),
                handle(
                    "hinge_cabinet",
                    FixtureKind::HingeCabinet,
                    &["hinge_cabinet_door_hinge"],
                    None,
                ),
                handle("drawer", FixtureKind::Drawer, &["drawer_slide"], None),
                handle(
                    "microwave",
                    FixtureKind::Microwave,
                    &["microwave_door_hinge"],
                    Some("microwave_start_button"),
                ),
                handle("laptop", FixtureKind::Laptop, &["laptop_lid_hinge"], None),
            ],
        }
    }

    pub fn with(mut self, fixture: FixtureHandle) -> Self {
        self.fixtures.push(fixture);
        self
    }

    pub fn without(mut self, kind: FixtureKind) -> Self {
        self.fixtures.retain(|f| f.kind != kind);
        self
    }
}

impl FixtureProvider for MockFixtures {
    fn get_fixture(&self, kind: FixtureKind) -> Option<FixtureHandle> {
        self.fixtures.iter().find(|f| f.kind == kind).cloned()
    }
}
