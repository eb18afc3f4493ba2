//! Static module metadata and the parameter descriptors shown in the host's
//! module configuration UI.

use serde::Serialize;
use serde_json::Value;
use serde_json::json;

use crate::MODULE_NAME;
use crate::config::DEFAULT_SCRIPT_PATH;

/// Interface version of the host module API this module targets.
pub const INTERFACE_VERSION: &str = "1.2.0";

pub const MODULE_DESCRIPTION: &str = "Processor module that reacts when new evidence is registered and \
     launches an external script to process E01 images (e.g. Plaso, KAPE).";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleType {
    /// Hook-driven module.
    Processor,
}

/// Value type of a configuration parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Bool,
    String,
}

/// One configurable parameter as advertised to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDescriptor {
    pub param_name: &'static str,
    pub param_human_name: &'static str,
    pub param_description: &'static str,
    pub default: Value,
    pub mandatory: bool,
    #[serde(rename = "type")]
    pub param_type: ParamType,
}

/// Everything the host reads about the module when loading it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleInfo {
    pub module_name: &'static str,
    pub module_description: &'static str,
    pub interface_version: &'static str,
    pub module_version: &'static str,
    pub module_type: ModuleType,
    pub pipeline_support: bool,
    pub module_configuration: Vec<ParamDescriptor>,
}

pub fn module_info() -> ModuleInfo {
    ModuleInfo {
        module_name: MODULE_NAME,
        module_description: MODULE_DESCRIPTION,
        interface_version: INTERFACE_VERSION,
        module_version: env!("CARGO_PKG_VERSION"),
        module_type: ModuleType::Processor,
        pipeline_support: false,
        module_configuration: module_configuration(),
    }
}

pub fn module_configuration() -> Vec<ParamDescriptor> {
    vec![
        ParamDescriptor {
            param_name: "enabled",
            param_human_name: "Enable E01 processor",
            param_description: "If false, the module will ignore hooks and not launch any processing.",
            default: json!(true),
            mandatory: true,
            param_type: ParamType::Bool,
        },
        ParamDescriptor {
            param_name: "e01_script_path",
            param_human_name: "E01 processing script path",
            param_description: "Absolute path inside the worker/webapp container to the script that \
                 will process the E01 image. The script must be executable and reachable from the \
                 IRIS process.",
            default: json!(DEFAULT_SCRIPT_PATH),
            mandatory: true,
            param_type: ParamType::String,
        },
        ParamDescriptor {
            param_name: "e01_script_extra_args",
            param_human_name: "Extra arguments for the script",
            param_description: "Optional additional CLI arguments passed to the script. The E01 file \
                 path is always provided as the first positional argument.",
            default: json!(""),
            mandatory: false,
            param_type: ParamType::String,
        },
        ParamDescriptor {
            param_name: "log_debug",
            param_human_name: "Verbose logging",
            param_description: "If true, the module logs detailed information about evidence \
                 resolution and command execution to the module log.",
            default: json!(false),
            mandatory: false,
            param_type: ParamType::Bool,
        },
    ]
}
