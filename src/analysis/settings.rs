use std::collections::HashSet;

/// Policy configuration for the safety analysis
///
/// The two historical policy variants are collapsed into one engine: the minimal policy permits
/// cross-class reads of final primitive statics (recording a dependency edge), the strict
/// variant forbids every cross-class static read.
pub struct Settings {
    /// Permit `getstatic` of a final, primitive-typed field of another class
    pub allow_cross_class_final_getstatic: bool,

    /// Class names pre-marked safe, bypassing independent classification
    ///
    /// This is the trusted platform-infrastructure allow-list: foundational runtime classes
    /// whose initialized state the embedding runtime guarantees.
    pub seed_safe_names: HashSet<String>,
}

impl Settings {
    pub fn new() -> Settings {
        Settings {
            allow_cross_class_final_getstatic: true,
            seed_safe_names: HashSet::new(),
        }
    }

    /// Strict variant: no cross-class static reads at all
    pub fn strict() -> Settings {
        Settings {
            allow_cross_class_final_getstatic: false,
            ..Settings::new()
        }
    }

    /// Core runtime classes trusted as safe without independent classification
    pub const TRUSTED_PLATFORM_CLASSES: &'static [&'static str] = &[
        "java/lang/String",
        "java/lang/System",
        "java/lang/ThreadGroup",
        "java/lang/Thread",
        "java/lang/Class",
        "java/lang/reflect/Method",
        "java/lang/ref/Finalizer",
        "java/lang/OutOfMemoryError",
        "java/lang/NullPointerException",
        "java/lang/ClassCastException",
        "java/lang/ArrayStoreException",
        "java/lang/ArithmeticException",
        "java/lang/StackOverflowError",
        "java/lang/IllegalMonitorStateException",
        "java/lang/IllegalArgumentException",
        "java/lang/Compiler",
        "java/lang/invoke/MethodHandle",
        "java/lang/invoke/MethodHandleNatives",
    ];

    /// Seed the built-in trusted platform allow-list
    pub fn with_trusted_platform_classes(mut self) -> Settings {
        self.seed_safe_names
            .extend(Self::TRUSTED_PLATFORM_CLASSES.iter().map(|s| s.to_string()));
        self
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings::new()
    }
}
