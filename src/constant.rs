//! This module contains constants that are needed throughout the codebase.

/// The prefix of the origin string of every symbol that denotes an input of
/// the method under analysis.
pub const ROOT_ORIGIN_PREFIX: &str = "{ROOT}";

/// The name of the root class of the class hierarchy.
pub const JAVA_OBJECT: &str = "java/lang/Object";

/// The name of the error thrown into a state whose bytecode turned out to be
/// malformed.
pub const VERIFY_ERROR: &str = "java/lang/VerifyError";

/// The name of the exception thrown when dereferencing null.
pub const NULL_POINTER_EXCEPTION: &str = "java/lang/NullPointerException";

/// The name of the exception thrown by an out-of-range array access.
pub const ARRAY_INDEX_OUT_OF_BOUNDS_EXCEPTION: &str =
    "java/lang/ArrayIndexOutOfBoundsException";

/// The name of the exception thrown when creating an array with a negative
/// length.
pub const NEGATIVE_ARRAY_SIZE_EXCEPTION: &str = "java/lang/NegativeArraySizeException";

/// The name of the error thrown when a class cannot be resolved.
pub const NO_CLASS_DEFINITION_FOUND_ERROR: &str = "java/lang/NoClassDefFoundError";

/// The name of the error thrown when a class is resolved but not accessible
/// from the accessing class.
pub const ILLEGAL_ACCESS_ERROR: &str = "java/lang/IllegalAccessError";

/// The name of the error thrown when instantiating an interface or an
/// abstract class.
pub const INSTANTIATION_ERROR: &str = "java/lang/InstantiationError";

/// The offset to the next instruction for the single-byte loads
/// (`iload_0`, `aload_3`, ...).
pub const XLOAD_N_OFFSET: u32 = 1;

/// The offset to the next instruction for the loads with an explicit slot
/// operand (`iload`, `aload`, ...).
pub const XLOAD_OFFSET: u32 = 2;

/// The offset to the next instruction for the array loads (`iaload`,
/// `aaload`, ...).
pub const XALOAD_OFFSET: u32 = 1;

/// The offset to the next instruction for `getfield` and `getstatic`.
pub const GETX_OFFSET: u32 = 3;

/// The offset to the next instruction for `new`.
pub const NEW_OFFSET: u32 = 3;

/// The offset to the next instruction for `newarray`.
pub const NEWARRAY_OFFSET: u32 = 2;

/// The offset to the next instruction for `anewarray`.
pub const ANEWARRAY_OFFSET: u32 = 3;

/// The offset to the next instruction for `invokestatic`.
pub const INVOKESTATIC_OFFSET: u32 = 3;

/// The maximum depth of a method's operand stack.
///
/// Class files encode `max_stack` in two bytes, so no verified method can
/// exceed this.
pub const DEFAULT_MAX_OPERAND_STACK_DEPTH: usize = 65_535;

/// The default for whether expanding a symbolic reference to an array also
/// assumes the array length is nonnegative.
pub const DEFAULT_ARRAY_LENGTH_ASSUMPTION: bool = true;

/// The default number of feasibility queries the generator performs before
/// polling the watchdog.
pub const DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS: usize = 100;

/// The first address handed out by a fresh heap.
///
/// Address zero is never allocated so that it can never be confused with the
/// null reference in rendered output.
pub const FIRST_HEAP_ADDRESS: u64 = 1;

/// The identifier of the root state of an exploration.
pub const ROOT_BRANCH_IDENTIFIER: &str = ".1";
