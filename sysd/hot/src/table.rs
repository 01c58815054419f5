//! Fixed layout of the table shared by the cold and hot images.
//!
//! Everything here is `#[repr(C)]` plain old data: both images are linked
//! separately and only agree on this layout.

use core::ffi::{c_char, CStr};
use core::fmt;
use core::ptr;

/// A user entry point: no arguments, no return value
pub type UserFn = extern "C" fn();

/// User symbols exchanged through the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Autonomous,
    Initialize,
    OpControl,
    Disabled,
    CompetitionInitialize,
    /// Initializer with C++ linkage, called by the built-in `initialize`
    CppInitialize,
}

impl Symbol {
    pub const COUNT: usize = 6;

    pub const ALL: [Symbol; Symbol::COUNT] = [
        Symbol::Autonomous,
        Symbol::Initialize,
        Symbol::OpControl,
        Symbol::Disabled,
        Symbol::CompetitionInitialize,
        Symbol::CppInitialize,
    ];

    /// Link name of the symbol
    pub const fn name(self) -> &'static str {
        match self {
            Symbol::Autonomous => "autonomous",
            Symbol::Initialize => "initialize",
            Symbol::OpControl => "opcontrol",
            Symbol::Disabled => "disabled",
            Symbol::CompetitionInitialize => "competition_initialize",
            Symbol::CppInitialize => "cpp_initialize",
        }
    }

    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Symbol {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "{=str}", self.name());
    }
}

/// Entry points supplied by the hot image; `None` is a null pointer
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct HotFunctions {
    pub autonomous: Option<UserFn>,
    pub initialize: Option<UserFn>,
    pub opcontrol: Option<UserFn>,
    pub disabled: Option<UserFn>,
    pub competition_initialize: Option<UserFn>,
    pub cpp_initialize: Option<UserFn>,
}

impl HotFunctions {
    pub const EMPTY: Self = Self {
        autonomous: None,
        initialize: None,
        opcontrol: None,
        disabled: None,
        competition_initialize: None,
        cpp_initialize: None,
    };

    pub const fn get(&self, symbol: Symbol) -> Option<UserFn> {
        match symbol {
            Symbol::Autonomous => self.autonomous,
            Symbol::Initialize => self.initialize,
            Symbol::OpControl => self.opcontrol,
            Symbol::Disabled => self.disabled,
            Symbol::CompetitionInitialize => self.competition_initialize,
            Symbol::CppInitialize => self.cpp_initialize,
        }
    }

    pub fn set(&mut self, symbol: Symbol, entry: Option<UserFn>) {
        let slot = match symbol {
            Symbol::Autonomous => &mut self.autonomous,
            Symbol::Initialize => &mut self.initialize,
            Symbol::OpControl => &mut self.opcontrol,
            Symbol::Disabled => &mut self.disabled,
            Symbol::CompetitionInitialize => &mut self.competition_initialize,
            Symbol::CppInitialize => &mut self.cpp_initialize,
        };
        *slot = entry;
    }

    /// Builder-style [`HotFunctions::set`]
    pub fn with(mut self, symbol: Symbol, entry: UserFn) -> Self {
        self.set(symbol, Some(entry));
        self
    }

    /// Number of non-null entries
    pub fn len(&self) -> usize {
        Symbol::ALL.iter().filter(|s| self.get(**s).is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HotFunctions {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// The table itself
#[repr(C)]
#[derive(Debug)]
pub struct HotTable {
    compile_timestamp: *const c_char,
    compile_directory: *const c_char,
    pub functions: HotFunctions,
}

// Only ever points at immutable, NUL-terminated strings with 'static lifetime.
#[allow(unsafe_code)]
unsafe impl Sync for HotTable {}
#[allow(unsafe_code)]
unsafe impl Send for HotTable {}

impl HotTable {
    /// All-null table
    pub const EMPTY: Self = Self {
        compile_timestamp: ptr::null(),
        compile_directory: ptr::null(),
        functions: HotFunctions::EMPTY,
    };

    /// Table filled from the hot image's exports
    pub const fn new(build: BuildInfo, functions: HotFunctions) -> Self {
        Self {
            compile_timestamp: build.timestamp.as_ptr(),
            compile_directory: build.directory.as_ptr(),
            functions,
        }
    }

    /// Build metadata of the image that filled the table, if any
    pub fn build_info(&self) -> Option<BuildInfo> {
        if self.compile_timestamp.is_null() || self.compile_directory.is_null() {
            return None;
        }
        // Non-null pointers only come from `HotTable::new`, which takes
        // 'static CStrs.
        #[allow(unsafe_code)]
        let (timestamp, directory) = unsafe {
            (
                CStr::from_ptr(self.compile_timestamp),
                CStr::from_ptr(self.compile_directory),
            )
        };
        Some(BuildInfo { timestamp, directory })
    }

    /// Every pointer in the table is null
    pub fn is_empty(&self) -> bool {
        self.compile_timestamp.is_null() && self.compile_directory.is_null() && self.functions.is_empty()
    }
}

impl Default for HotTable {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Compile metadata of a hot image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub timestamp: &'static CStr,
    pub directory: &'static CStr,
}
