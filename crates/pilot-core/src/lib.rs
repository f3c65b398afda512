pub mod atmos;
pub mod autopilot;
pub mod data;
pub mod fms;
pub mod geo;
pub mod instruction;
pub mod perf;
pub mod position;

pub use autopilot::{calculate_demanded_track_on_current_track, Autopilot, FlightLimits, LateralMode, MIN_XTK_M};
pub use data::{
    BearingType, FixedVariation, HoldLegLengthType, MagneticVariation, NavDataSource, PerfDataSource, PublishedHold,
    TurnDirection, WeatherPoint, WeatherSource, Waypoint,
};
pub use fms::{
    AircraftFms, CourseInterceptInfo, FmsEvent, FmsPoint, FmsUpdate, LegFactory, NavDataLeg, RouteLeg, RouteLegType,
    SharedFmsPoint,
};
pub use geo::{haversine_distance, turn_amount, GeoPoint};
pub use instruction::{AltimeterSetting, HoldPattern, Instruction, InstructionError, RouteEntry};
pub use perf::{BuiltinPerfData, PerfData, PerformanceEngine};
pub use position::{AircraftPosition, AircraftState};
