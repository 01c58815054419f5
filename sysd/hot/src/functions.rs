//! User entry point registry.
//!
//! Every user symbol is optional. A symbol the hot image did not supply
//! resolves to a built-in stub, which passes through to the kernel's
//! secondary-linkage default for that symbol ([`LinkageDefaults`]). This is
//! the whole of the "weak symbol" mechanism: present-or-default lookup.

use log::{debug, info};
use spin::Once;

use crate::{Handshake, HotRegion, HotTable, Symbol, UserFn};

extern "C" fn noop() {}

/// Secondary-linkage implementations the built-in stubs pass through to.
///
/// These correspond to user code with the other linkage (the C++ entry
/// points) linked into the cold kernel. Unset entries do nothing.
#[derive(Debug, Clone, Copy)]
pub struct LinkageDefaults {
    autonomous: UserFn,
    initialize: UserFn,
    opcontrol: UserFn,
    disabled: UserFn,
    competition_initialize: UserFn,
}

impl LinkageDefaults {
    /// Every default does nothing
    pub const NOOP: Self = Self {
        autonomous: noop,
        initialize: noop,
        opcontrol: noop,
        disabled: noop,
        competition_initialize: noop,
    };

    /// Override the default for one symbol.
    ///
    /// [`Symbol::Initialize`] and [`Symbol::CppInitialize`] share the
    /// initializer default.
    pub const fn with(mut self, symbol: Symbol, entry: UserFn) -> Self {
        match symbol {
            Symbol::Autonomous => self.autonomous = entry,
            Symbol::Initialize | Symbol::CppInitialize => self.initialize = entry,
            Symbol::OpControl => self.opcontrol = entry,
            Symbol::Disabled => self.disabled = entry,
            Symbol::CompetitionInitialize => self.competition_initialize = entry,
        }
        self
    }

    const fn get(&self, symbol: Symbol) -> UserFn {
        match symbol {
            Symbol::Autonomous => self.autonomous,
            Symbol::Initialize | Symbol::CppInitialize => self.initialize,
            Symbol::OpControl => self.opcontrol,
            Symbol::Disabled => self.disabled,
            Symbol::CompetitionInitialize => self.competition_initialize,
        }
    }
}

impl Default for LinkageDefaults {
    fn default() -> Self {
        Self::NOOP
    }
}

/// Where a resolved entry point came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySource {
    /// Supplied by the hot image
    Hot,
    /// Built-in stub
    Builtin,
}

/// A resolved, callable user entry point
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    func: UserFn,
    source: EntrySource,
}

impl Entry {
    pub fn call(&self) {
        (self.func)()
    }

    pub fn func(&self) -> UserFn {
        self.func
    }

    pub fn source(&self) -> EntrySource {
        self.source
    }

    pub fn is_hot(&self) -> bool {
        self.source == EntrySource::Hot
    }
}

/// Registry of user entry points backed by a verified hot table.
///
/// Each symbol is read from the table at most once, the first time it is
/// needed, and cached afterwards.
pub struct UserFunctions {
    table: &'static HotTable,
    defaults: LinkageDefaults,
    resolved: [Once<Entry>; Symbol::COUNT],
}

impl UserFunctions {
    pub fn new(handshake: Handshake, defaults: LinkageDefaults) -> Self {
        const UNRESOLVED: Once<Entry> = Once::new();
        Self {
            table: handshake.table(),
            defaults,
            resolved: [UNRESOLVED; Symbol::COUNT],
        }
    }

    /// Entry point for `symbol`, resolving it on first use
    pub fn entry(&self, symbol: Symbol) -> Entry {
        *self.resolved[symbol.index()].call_once(|| self.resolve(symbol))
    }

    /// Resolve and call `symbol`
    pub fn call(&self, symbol: Symbol) {
        self.entry(symbol).call()
    }

    fn resolve(&self, symbol: Symbol) -> Entry {
        let entry = match self.table.functions.get(symbol) {
            Some(func) => Entry {
                func,
                source: EntrySource::Hot,
            },
            None => self.builtin(symbol),
        };
        debug!("resolved {} to {:?} entry", symbol, entry.source);
        entry
    }

    fn builtin(&self, symbol: Symbol) -> Entry {
        let func = match symbol {
            // The built-in `initialize` calls whatever `cpp_initialize` is.
            Symbol::Initialize => self.entry(Symbol::CppInitialize).func,
            other => self.defaults.get(other),
        };
        Entry {
            func,
            source: EntrySource::Builtin,
        }
    }
}

static USER_FUNCTIONS: Once<UserFunctions> = Once::new();

/// Run the handshake and publish the process-wide registry.
///
/// Only the first call does any work; later calls return the registry
/// published by the first one and leave `region` untouched.
pub fn boot(region: HotRegion, defaults: LinkageDefaults) -> &'static UserFunctions {
    USER_FUNCTIONS.call_once(|| {
        let handshake = region.handshake();
        if let Some(build) = handshake.build_info() {
            info!("adopted hot image built {:?} in {:?}", build.timestamp, build.directory);
        }
        UserFunctions::new(handshake, defaults)
    })
}

/// The registry published by [`boot`], if it ran
pub fn published() -> Option<&'static UserFunctions> {
    USER_FUNCTIONS.get()
}
