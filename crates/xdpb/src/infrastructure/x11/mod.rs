//! X11 implementation of [`BarrierService`] using `x11rb`.
//!
//! # Extensions used (for beginners)
//!
//! | Extension | Minimum | Used for                                         |
//! |-----------|---------|--------------------------------------------------|
//! | XFixes    | 5.0     | creating and destroying pointer barriers         |
//! | XInput    | 2.3     | BarrierHit / BarrierLeave events, pointer release |
//! | RandR     | 1.2     | output (CRTC) rectangles, screen-change events    |
//!
//! All three are checked in [`X11BarrierService::connect`]; a missing or too
//! old extension is a startup error.
//!
//! # Waiting for events
//!
//! `x11rb` reads the socket itself and buffers whatever it finds, so the
//! runtime loop always drains [`poll_event`](BarrierService::poll_event)
//! before it waits.  The wait registers the connection's file descriptor with
//! Tokio through `AsyncFd` and resolves once the socket is readable.

use std::os::unix::io::{AsRawFd, RawFd};

use async_trait::async_trait;
use tokio::io::unix::AsyncFd;
use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::protocol::randr::{self, ConnectionExt as _};
use x11rb::protocol::xfixes::{self, BarrierDirections, ConnectionExt as _};
use x11rb::protocol::xinput::{self, ConnectionExt as _};
use x11rb::protocol::xproto::Window;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use xdpb_core::{BarrierDirection, BarrierHandle, EdgeBarrier, MotionDelta, OutputRect};

use crate::application::barrier_service::{BarrierService, ConnectionEvent, ServiceError};

const XFIXES_NEED: (u32, u32) = (5, 0);
const XINPUT_NEED: (u16, u16) = (2, 3);
const RANDR_NEED: (u32, u32) = (1, 2);

/// A live connection to an X server with barrier events selected on the root
/// window.
pub struct X11BarrierService {
    // Declared before `conn` so the fd is deregistered before the socket closes.
    readiness: AsyncFd<RawFd>,
    conn: RustConnection,
    root: Window,
}

impl X11BarrierService {
    /// Connects to `display` (or `$DISPLAY`), verifies the required extensions,
    /// and selects barrier and screen-change events on the root window.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Connect`] if the display cannot be opened.
    /// - [`ServiceError::MissingExtension`] / [`ServiceError::ExtensionTooOld`]
    ///   if XFixes, XInput, or RandR is unusable.
    /// - [`ServiceError::Protocol`] / [`ServiceError::Io`] for other failures.
    pub fn connect(display: Option<&str>) -> Result<Self, ServiceError> {
        let (conn, screen_num) =
            x11rb::connect(display).map_err(|e| ServiceError::Connect(e.to_string()))?;
        let root = conn
            .setup()
            .roots
            .get(screen_num)
            .map(|screen| screen.root)
            .ok_or_else(|| ServiceError::Connect(format!("screen {screen_num} does not exist")))?;

        check_extensions(&conn)?;

        conn.xinput_xi_select_events(
            root,
            &[xinput::EventMask {
                deviceid: xinput::Device::ALL_MASTER.into(),
                mask: vec![xinput::XIEventMask::BARRIER_HIT | xinput::XIEventMask::BARRIER_LEAVE],
            }],
        )
        .map_err(protocol)?
        .check()
        .map_err(protocol)?;
        conn.randr_select_input(root, randr::NotifyMask::SCREEN_CHANGE)
            .map_err(protocol)?
            .check()
            .map_err(protocol)?;

        let readiness = AsyncFd::new(conn.stream().as_raw_fd())?;
        info!(root, screen = screen_num, "connected to X server");
        Ok(Self { readiness, conn, root })
    }
}

fn protocol(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Protocol(e.to_string())
}

fn require_present(conn: &RustConnection, name: &'static str) -> Result<(), ServiceError> {
    match conn.extension_information(name).map_err(protocol)? {
        Some(_) => Ok(()),
        None => Err(ServiceError::MissingExtension(name)),
    }
}

fn require_version<T: PartialOrd + std::fmt::Display>(
    name: &'static str,
    have: (T, T),
    need: (T, T),
    need_text: &'static str,
) -> Result<(), ServiceError> {
    if have < need {
        return Err(ServiceError::ExtensionTooOld {
            name,
            have: format!("{}.{}", have.0, have.1),
            need: need_text,
        });
    }
    debug!(extension = name, "version {}.{}", have.0, have.1);
    Ok(())
}

fn check_extensions(conn: &RustConnection) -> Result<(), ServiceError> {
    require_present(conn, xfixes::X11_EXTENSION_NAME)?;
    let v = conn
        .xfixes_query_version(XFIXES_NEED.0, XFIXES_NEED.1)
        .map_err(protocol)?
        .reply()
        .map_err(protocol)?;
    require_version("XFixes", (v.major_version, v.minor_version), XFIXES_NEED, "5.0")?;

    require_present(conn, xinput::X11_EXTENSION_NAME)?;
    let v = conn
        .xinput_xi_query_version(XINPUT_NEED.0, XINPUT_NEED.1)
        .map_err(protocol)?
        .reply()
        .map_err(protocol)?;
    require_version("XInput", (v.major_version, v.minor_version), XINPUT_NEED, "2.3")?;

    require_present(conn, randr::X11_EXTENSION_NAME)?;
    let v = conn
        .randr_query_version(RANDR_NEED.0, RANDR_NEED.1)
        .map_err(protocol)?
        .reply()
        .map_err(protocol)?;
    require_version("RandR", (v.major_version, v.minor_version), RANDR_NEED, "1.2")
}

/// The XFixes permitted-motion flag for a barrier pushed against in `direction`.
fn permitted_directions(direction: BarrierDirection) -> BarrierDirections {
    match direction {
        BarrierDirection::PositiveX => BarrierDirections::POSITIVE_X,
        BarrierDirection::NegativeX => BarrierDirections::NEGATIVE_X,
        BarrierDirection::PositiveY => BarrierDirections::POSITIVE_Y,
        BarrierDirection::NegativeY => BarrierDirections::NEGATIVE_Y,
    }
}

/// Converts barrier endpoints to the protocol's unsigned 16-bit coordinates.
fn wire_coordinates(edge: &EdgeBarrier) -> Result<[u16; 4], ServiceError> {
    let convert = |v: i32| u16::try_from(v).map_err(|_| ServiceError::OutOfRange(*edge));
    Ok([convert(edge.x1)?, convert(edge.y1)?, convert(edge.x2)?, convert(edge.y2)?])
}

fn fp3232_to_f64(value: xinput::Fp3232) -> f64 {
    f64::from(value.integral) + f64::from(value.frac) / 4_294_967_296.0
}

fn motion_delta(event: &xinput::BarrierHitEvent) -> MotionDelta {
    MotionDelta::new(fp3232_to_f64(event.dx), fp3232_to_f64(event.dy))
}

fn translate(event: Event) -> ConnectionEvent {
    match event {
        Event::XinputBarrierHit(hit) => ConnectionEvent::BarrierHit {
            handle: BarrierHandle(hit.barrier),
            delta: motion_delta(&hit),
            device_id: hit.deviceid,
            event_id: hit.eventid,
        },
        Event::XinputBarrierLeave(leave) => ConnectionEvent::BarrierLeave {
            handle: BarrierHandle(leave.barrier),
            delta: motion_delta(&leave),
        },
        Event::RandrScreenChangeNotify(_) => ConnectionEvent::TopologyChanged,
        Event::Error(e) => {
            warn!(?e, "X11 request failed");
            ConnectionEvent::Other
        }
        _ => ConnectionEvent::Other,
    }
}

#[async_trait(?Send)]
impl BarrierService for X11BarrierService {
    fn create_barrier(&mut self, edge: &EdgeBarrier) -> Result<BarrierHandle, ServiceError> {
        let [x1, y1, x2, y2] = wire_coordinates(edge)?;
        let id = self.conn.generate_id().map_err(protocol)?;
        self.conn
            .xfixes_create_pointer_barrier(
                id,
                self.root,
                x1,
                y1,
                x2,
                y2,
                permitted_directions(edge.direction),
                &[],
            )
            .map_err(protocol)?
            .check()
            .map_err(protocol)?;
        Ok(BarrierHandle(id))
    }

    fn destroy_barrier(&mut self, handle: BarrierHandle) -> Result<(), ServiceError> {
        self.conn.xfixes_delete_pointer_barrier(handle.0).map_err(protocol)?;
        Ok(())
    }

    fn release_pointer(
        &mut self,
        device_id: u16,
        handle: BarrierHandle,
        event_id: u32,
    ) -> Result<(), ServiceError> {
        self.conn
            .xinput_xi_barrier_release_pointer(&[xinput::BarrierReleasePointerInfo {
                deviceid: device_id,
                barrier: handle.0,
                eventid: event_id,
            }])
            .map_err(protocol)?;
        Ok(())
    }

    fn query_output_rectangles(&mut self) -> Result<Vec<OutputRect>, ServiceError> {
        let resources = self
            .conn
            .randr_get_screen_resources_current(self.root)
            .map_err(protocol)?
            .reply()
            .map_err(protocol)?;

        let mut rects = Vec::with_capacity(resources.crtcs.len());
        for crtc in resources.crtcs {
            let info = self
                .conn
                .randr_get_crtc_info(crtc, resources.config_timestamp)
                .map_err(protocol)?
                .reply()
                .map_err(protocol)?;
            rects.push(OutputRect::new(
                i32::from(info.x),
                i32::from(info.y),
                u32::from(info.width),
                u32::from(info.height),
            ));
        }
        debug!(?rects, "queried output rectangles");
        Ok(rects)
    }

    fn flush(&mut self) -> Result<(), ServiceError> {
        self.conn.flush().map_err(protocol)
    }

    fn poll_event(&mut self) -> Result<Option<ConnectionEvent>, ServiceError> {
        Ok(self.conn.poll_for_event().map_err(protocol)?.map(translate))
    }

    async fn wait_readable(&self) -> Result<(), ServiceError> {
        let mut guard = self.readiness.readable().await?;
        guard.clear_ready();
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
