use tracing::{debug, warn};
use winapp_core::{App, AppId, Architecture, Scope};

use crate::error::{RegistryError, Target};
use crate::marshal::{read_app, write_app};
use crate::store::{Access, Hive, Store, StoreError, StoreKey, WordWidth};

/// Path of the installed-programs key, below both the machine and the user
/// hive.
pub const UNINSTALL_ROOT: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall";

/// A view of the machine or user application registry, either 32-bit or
/// 64-bit.
///
/// Exactly four views exist, one per architecture and scope. A view holds no
/// open handles: every operation opens what it needs with the least access
/// that suffices and releases it before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct View {
    name: &'static str,
    arch: Architecture,
    scope: Scope,
    hive: Hive,
    width: WordWidth,
}

impl View {
    pub const MACHINE_32: View = View {
        name: "32-bit machine",
        arch: Architecture::X86,
        scope: Scope::Machine,
        hive: Hive::LocalMachine,
        width: WordWidth::Bits32,
    };

    pub const MACHINE_64: View = View {
        name: "64-bit machine",
        arch: Architecture::X64,
        scope: Scope::Machine,
        hive: Hive::LocalMachine,
        width: WordWidth::Bits64,
    };

    pub const USER_32: View = View {
        name: "32-bit user",
        arch: Architecture::X86,
        scope: Scope::User,
        hive: Hive::CurrentUser,
        width: WordWidth::Bits32,
    };

    pub const USER_64: View = View {
        name: "64-bit user",
        arch: Architecture::X64,
        scope: Scope::User,
        hive: Hive::CurrentUser,
        width: WordWidth::Bits64,
    };

    /// All available application views.
    pub const ALL: [View; 4] = [
        Self::MACHINE_32,
        Self::MACHINE_64,
        Self::USER_32,
        Self::USER_64,
    ];

    pub const fn for_target(arch: Architecture, scope: Scope) -> View {
        match (arch, scope) {
            (Architecture::X86, Scope::Machine) => Self::MACHINE_32,
            (Architecture::X64, Scope::Machine) => Self::MACHINE_64,
            (Architecture::X86, Scope::User) => Self::USER_32,
            (Architecture::X64, Scope::User) => Self::USER_64,
        }
    }

    /// Returns the view for an architecture and scope given as text.
    pub fn for_names(arch: &str, scope: &str) -> Result<View, RegistryError> {
        let arch = match arch.trim() {
            "" => return Err(RegistryError::MissingArchitecture),
            text => Architecture::parse(text)
                .ok_or_else(|| RegistryError::UnrecognizedArchitecture(text.to_string()))?,
        };
        let scope = match scope.trim() {
            "" => return Err(RegistryError::MissingScope),
            text => Scope::parse(text)
                .ok_or_else(|| RegistryError::UnrecognizedScope(text.to_string()))?,
        };
        Ok(Self::for_target(arch, scope))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn architecture(&self) -> Architecture {
        self.arch
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn hive(&self) -> Hive {
        self.hive
    }

    pub fn word_width(&self) -> WordWidth {
        self.width
    }

    /// Adds `app` to the view.
    ///
    /// Fails with [`RegistryError::AlreadyExists`] when an application with
    /// the same ID is already present, in which case nothing is written. If
    /// writing an attribute fails, the attributes written before it remain.
    pub fn add<S: Store>(&self, store: &S, app: &App) -> Result<(), RegistryError> {
        self.validate_id(&app.id)?;
        debug!(view = self.name, id = %app.id, attributes = app.attributes.len(), "adding application");

        let root = self.root(store, Access::CREATE_SUB_KEY)?;
        let (key, existing) = root
            .create_subkey(app.id.as_str(), Access::SET_VALUE)
            .map_err(|source| self.store_error("create", Target::App(app.id.clone()), source))?;
        if existing {
            return Err(RegistryError::AlreadyExists {
                view: self.name,
                id: app.id.clone(),
            });
        }

        write_app(self.name, app, &key).inspect_err(|err| {
            warn!(view = self.name, id = %app.id, error = %err, "application was added with incomplete attributes");
        })
    }

    /// Removes the application with the given ID from the view.
    ///
    /// This only deletes the registry entry. It does not run the
    /// application's uninstall command or touch its files.
    pub fn remove<S: Store>(&self, store: &S, id: &AppId) -> Result<(), RegistryError> {
        self.validate_id(id)?;
        debug!(view = self.name, %id, "removing application");

        let root = self.root(store, Access::ENUMERATE_SUB_KEYS)?;
        root.delete_subkey(id.as_str())
            .map_err(|source| self.store_error("delete", Target::App(id.clone()), source))
    }

    /// Reports whether an application with the given ID is present.
    ///
    /// A missing application yields `Ok(false)`; any other failure is an
    /// error, since presence could not be determined.
    pub fn contains<S: Store>(&self, store: &S, id: &AppId) -> Result<bool, RegistryError> {
        match self.open_app(store, id) {
            Ok(_) => Ok(true),
            Err(RegistryError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Reads the application with the given ID.
    pub fn get<S: Store>(&self, store: &S, id: &AppId) -> Result<App, RegistryError> {
        let key = self.open_app(store, id)?;
        let attributes = read_app(self.name, id, &key)?;
        Ok(App {
            id: id.clone(),
            attributes,
        })
    }

    /// Reads every application in the view.
    ///
    /// The first application that cannot be opened or read aborts the whole
    /// listing.
    pub fn list<S: Store>(&self, store: &S) -> Result<Vec<App>, RegistryError> {
        debug!(view = self.name, "listing applications");
        let root = self.root(store, Access::ENUMERATE_SUB_KEYS)?;
        let ids = root
            .subkey_names()
            .map_err(|source| self.store_error("enumerate applications in", Target::Root, source))?;

        let mut apps = Vec::with_capacity(ids.len());
        for id in ids {
            let id = AppId::new(id);
            let key = root
                .open_subkey(id.as_str(), Access::QUERY_VALUE)
                .map_err(|source| self.store_error("open", Target::App(id.clone()), source))?;
            let attributes = read_app(self.name, &id, &key)?;
            apps.push(App { id, attributes });
        }

        Ok(apps)
    }

    fn open_app<S: Store>(&self, store: &S, id: &AppId) -> Result<S::Key, RegistryError> {
        self.validate_id(id)?;
        let root = self.root(store, Access::ENUMERATE_SUB_KEYS)?;
        root.open_subkey(id.as_str(), Access::QUERY_VALUE)
            .map_err(|source| self.store_error("open", Target::App(id.clone()), source))
    }

    fn root<S: Store>(&self, store: &S, access: Access) -> Result<S::Key, RegistryError> {
        store
            .open_root(self.hive, UNINSTALL_ROOT, access, self.width)
            .map_err(|source| self.store_error("open", Target::Root, source))
    }

    fn validate_id(&self, id: &AppId) -> Result<(), RegistryError> {
        id.validate().map_err(|reason| RegistryError::InvalidId {
            id: id.clone(),
            reason,
        })
    }

    fn store_error(
        &self,
        action: &'static str,
        target: Target,
        source: StoreError,
    ) -> RegistryError {
        RegistryError::from_store(self.name, action, target, source)
    }
}
