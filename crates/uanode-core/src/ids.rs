// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Well-known node ids of the OPC UA standard namespace (OPC 10000-6 Annex A).
//!
//! Only the ids the node manager core needs to reason about are listed:
//! reference types used during address-space assembly and browsing, the
//! standard objects events are routed through, the variable types whose
//! properties carry semantic meaning, and the built-in data types.

use crate::types::NodeId;

/// Standard reference type node ids.
pub mod reference_types {
    use super::NodeId;

    /// References (abstract base type) - i=31.
    pub const REFERENCES: NodeId = NodeId::numeric(0, 31);
    /// NonHierarchicalReferences - i=32.
    pub const NON_HIERARCHICAL_REFERENCES: NodeId = NodeId::numeric(0, 32);
    /// HierarchicalReferences - i=33.
    pub const HIERARCHICAL_REFERENCES: NodeId = NodeId::numeric(0, 33);
    /// HasChild - i=34.
    pub const HAS_CHILD: NodeId = NodeId::numeric(0, 34);
    /// Organizes - i=35.
    pub const ORGANIZES: NodeId = NodeId::numeric(0, 35);
    /// HasEventSource - i=36.
    pub const HAS_EVENT_SOURCE: NodeId = NodeId::numeric(0, 36);
    /// HasModellingRule - i=37.
    pub const HAS_MODELLING_RULE: NodeId = NodeId::numeric(0, 37);
    /// HasEncoding - i=38.
    pub const HAS_ENCODING: NodeId = NodeId::numeric(0, 38);
    /// HasDescription - i=39.
    pub const HAS_DESCRIPTION: NodeId = NodeId::numeric(0, 39);
    /// HasTypeDefinition - i=40.
    pub const HAS_TYPE_DEFINITION: NodeId = NodeId::numeric(0, 40);
    /// GeneratesEvent - i=41.
    pub const GENERATES_EVENT: NodeId = NodeId::numeric(0, 41);
    /// Aggregates - i=44.
    pub const AGGREGATES: NodeId = NodeId::numeric(0, 44);
    /// HasSubtype - i=45.
    pub const HAS_SUBTYPE: NodeId = NodeId::numeric(0, 45);
    /// HasProperty - i=46.
    pub const HAS_PROPERTY: NodeId = NodeId::numeric(0, 46);
    /// HasComponent - i=47.
    pub const HAS_COMPONENT: NodeId = NodeId::numeric(0, 47);
    /// HasNotifier - i=48.
    pub const HAS_NOTIFIER: NodeId = NodeId::numeric(0, 48);
    /// HasOrderedComponent - i=49.
    pub const HAS_ORDERED_COMPONENT: NodeId = NodeId::numeric(0, 49);
}

/// Standard object node ids.
pub mod objects {
    use super::NodeId;

    /// Root folder - i=84.
    pub const ROOT_FOLDER: NodeId = NodeId::numeric(0, 84);
    /// Objects folder - i=85.
    pub const OBJECTS_FOLDER: NodeId = NodeId::numeric(0, 85);
    /// Types folder - i=86.
    pub const TYPES_FOLDER: NodeId = NodeId::numeric(0, 86);
    /// Views folder - i=87.
    pub const VIEWS_FOLDER: NodeId = NodeId::numeric(0, 87);
    /// Server object - i=2253.
    pub const SERVER: NodeId = NodeId::numeric(0, 2253);
    /// ModellingRule Mandatory - i=78.
    pub const MODELLING_RULE_MANDATORY: NodeId = NodeId::numeric(0, 78);
    /// ModellingRule Optional - i=80.
    pub const MODELLING_RULE_OPTIONAL: NodeId = NodeId::numeric(0, 80);
}

/// Standard object type node ids.
pub mod object_types {
    use super::NodeId;

    /// BaseObjectType - i=58.
    pub const BASE_OBJECT_TYPE: NodeId = NodeId::numeric(0, 58);
    /// FolderType - i=61.
    pub const FOLDER_TYPE: NodeId = NodeId::numeric(0, 61);
    /// BaseEventType - i=2041.
    pub const BASE_EVENT_TYPE: NodeId = NodeId::numeric(0, 2041);
    /// AuditEventType - i=2052.
    pub const AUDIT_EVENT_TYPE: NodeId = NodeId::numeric(0, 2052);
    /// AuditWriteUpdateEventType - i=2100.
    pub const AUDIT_WRITE_UPDATE_EVENT_TYPE: NodeId = NodeId::numeric(0, 2100);
    /// ConditionType - i=2782.
    pub const CONDITION_TYPE: NodeId = NodeId::numeric(0, 2782);
    /// RefreshStartEventType - i=2787.
    pub const REFRESH_START_EVENT_TYPE: NodeId = NodeId::numeric(0, 2787);
    /// RefreshEndEventType - i=2788.
    pub const REFRESH_END_EVENT_TYPE: NodeId = NodeId::numeric(0, 2788);
}

/// Standard variable type node ids.
pub mod variable_types {
    use super::NodeId;

    /// BaseVariableType - i=62.
    pub const BASE_VARIABLE_TYPE: NodeId = NodeId::numeric(0, 62);
    /// BaseDataVariableType - i=63.
    pub const BASE_DATA_VARIABLE_TYPE: NodeId = NodeId::numeric(0, 63);
    /// PropertyType - i=68.
    pub const PROPERTY_TYPE: NodeId = NodeId::numeric(0, 68);
    /// DataItemType - i=2365.
    pub const DATA_ITEM_TYPE: NodeId = NodeId::numeric(0, 2365);
    /// AnalogItemType - i=2368.
    pub const ANALOG_ITEM_TYPE: NodeId = NodeId::numeric(0, 2368);
    /// TwoStateDiscreteType - i=2373.
    pub const TWO_STATE_DISCRETE_TYPE: NodeId = NodeId::numeric(0, 2373);
    /// MultiStateDiscreteType - i=2376.
    pub const MULTI_STATE_DISCRETE_TYPE: NodeId = NodeId::numeric(0, 2376);
    /// ArrayItemType - i=12021.
    pub const ARRAY_ITEM_TYPE: NodeId = NodeId::numeric(0, 12021);
    /// YArrayItemType - i=12029.
    pub const Y_ARRAY_ITEM_TYPE: NodeId = NodeId::numeric(0, 12029);
    /// XYArrayItemType - i=12038.
    pub const XY_ARRAY_ITEM_TYPE: NodeId = NodeId::numeric(0, 12038);
    /// ImageItemType - i=12047.
    pub const IMAGE_ITEM_TYPE: NodeId = NodeId::numeric(0, 12047);
    /// CubeItemType - i=12057.
    pub const CUBE_ITEM_TYPE: NodeId = NodeId::numeric(0, 12057);
}

/// Standard data type node ids.
pub mod data_types {
    use super::NodeId;

    /// Boolean - i=1.
    pub const BOOLEAN: NodeId = NodeId::numeric(0, 1);
    /// SByte - i=2.
    pub const SBYTE: NodeId = NodeId::numeric(0, 2);
    /// Byte - i=3.
    pub const BYTE: NodeId = NodeId::numeric(0, 3);
    /// Int16 - i=4.
    pub const INT16: NodeId = NodeId::numeric(0, 4);
    /// UInt16 - i=5.
    pub const UINT16: NodeId = NodeId::numeric(0, 5);
    /// Int32 - i=6.
    pub const INT32: NodeId = NodeId::numeric(0, 6);
    /// UInt32 - i=7.
    pub const UINT32: NodeId = NodeId::numeric(0, 7);
    /// Int64 - i=8.
    pub const INT64: NodeId = NodeId::numeric(0, 8);
    /// UInt64 - i=9.
    pub const UINT64: NodeId = NodeId::numeric(0, 9);
    /// Float - i=10.
    pub const FLOAT: NodeId = NodeId::numeric(0, 10);
    /// Double - i=11.
    pub const DOUBLE: NodeId = NodeId::numeric(0, 11);
    /// String - i=12.
    pub const STRING: NodeId = NodeId::numeric(0, 12);
    /// DateTime - i=13.
    pub const DATE_TIME: NodeId = NodeId::numeric(0, 13);
    /// Guid - i=14.
    pub const GUID: NodeId = NodeId::numeric(0, 14);
    /// ByteString - i=15.
    pub const BYTE_STRING: NodeId = NodeId::numeric(0, 15);
    /// NodeId - i=17.
    pub const NODE_ID: NodeId = NodeId::numeric(0, 17);
    /// StatusCode - i=19.
    pub const STATUS_CODE: NodeId = NodeId::numeric(0, 19);
    /// QualifiedName - i=20.
    pub const QUALIFIED_NAME: NodeId = NodeId::numeric(0, 20);
    /// LocalizedText - i=21.
    pub const LOCALIZED_TEXT: NodeId = NodeId::numeric(0, 21);
    /// Structure - i=22.
    pub const STRUCTURE: NodeId = NodeId::numeric(0, 22);
    /// BaseDataType - i=24.
    pub const BASE_DATA_TYPE: NodeId = NodeId::numeric(0, 24);
    /// Number - i=26.
    pub const NUMBER: NodeId = NodeId::numeric(0, 26);
    /// Integer - i=27.
    pub const INTEGER: NodeId = NodeId::numeric(0, 27);
    /// UInteger - i=28.
    pub const UINTEGER: NodeId = NodeId::numeric(0, 28);
    /// Enumeration - i=29.
    pub const ENUMERATION: NodeId = NodeId::numeric(0, 29);
    /// Duration - i=290.
    pub const DURATION: NodeId = NodeId::numeric(0, 290);
    /// Argument - i=296.
    pub const ARGUMENT: NodeId = NodeId::numeric(0, 296);
    /// Range - i=884.
    pub const RANGE: NodeId = NodeId::numeric(0, 884);
    /// EUInformation - i=887.
    pub const EU_INFORMATION: NodeId = NodeId::numeric(0, 887);
}

/// Standard aggregate functions.
pub mod aggregate_functions {
    use super::NodeId;

    /// Interpolative - i=2341.
    pub const INTERPOLATIVE: NodeId = NodeId::numeric(0, 2341);
    /// Average - i=2342.
    pub const AVERAGE: NodeId = NodeId::numeric(0, 2342);
    /// TimeAverage - i=2343.
    pub const TIME_AVERAGE: NodeId = NodeId::numeric(0, 2343);
    /// Total - i=2344.
    pub const TOTAL: NodeId = NodeId::numeric(0, 2344);
    /// Minimum - i=2346.
    pub const MINIMUM: NodeId = NodeId::numeric(0, 2346);
    /// Maximum - i=2347.
    pub const MAXIMUM: NodeId = NodeId::numeric(0, 2347);
    /// Count - i=2352.
    pub const COUNT: NodeId = NodeId::numeric(0, 2352);
}

/// Standard browse names the node manager looks children up by.
pub mod browse_names {
    /// EURange property.
    pub const EU_RANGE: &str = "EURange";
    /// InstrumentRange property.
    pub const INSTRUMENT_RANGE: &str = "InstrumentRange";
    /// EngineeringUnits property.
    pub const ENGINEERING_UNITS: &str = "EngineeringUnits";
    /// Title property.
    pub const TITLE: &str = "Title";
    /// AxisDefinition property.
    pub const AXIS_DEFINITION: &str = "AxisDefinition";
    /// XAxisDefinition property.
    pub const X_AXIS_DEFINITION: &str = "XAxisDefinition";
    /// YAxisDefinition property.
    pub const Y_AXIS_DEFINITION: &str = "YAxisDefinition";
    /// ZAxisDefinition property.
    pub const Z_AXIS_DEFINITION: &str = "ZAxisDefinition";
    /// FalseState property.
    pub const FALSE_STATE: &str = "FalseState";
    /// TrueState property.
    pub const TRUE_STATE: &str = "TrueState";
    /// EnumStrings property.
    pub const ENUM_STRINGS: &str = "EnumStrings";
    /// Definition property.
    pub const DEFINITION: &str = "Definition";
    /// ValuePrecision property.
    pub const VALUE_PRECISION: &str = "ValuePrecision";
    /// InputArguments property.
    pub const INPUT_ARGUMENTS: &str = "InputArguments";
    /// OutputArguments property.
    pub const OUTPUT_ARGUMENTS: &str = "OutputArguments";
}
