//! The terrain session: request terrain, place it in the scene, and keep the
//! bookkeeping needed to pick it and free it again.

use std::collections::HashMap;
use std::sync::Arc;

use geoview_config::{Config, SatelliteMaterial, ShadingConfig};
use geoview_materials::{
    DistanceShading, Material, MaterialError, MaterialFactory, UniformValue, uniform_names,
};
use geoview_scene::{
    Intersection, ObjectId, Ray, Raycaster, ResourceBackend, ResourceDisposer, Scene, SceneObject,
    SharedCamera, SharedScene, interaction,
};
use glam::Vec3;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

use crate::endpoints::DebugEndpoints;
use crate::engine::{
    EngineError, EngineOptions, RgbEventReceiver, RgbTerrainEvent, TerrainEngine, TerrainRequest,
    VectorReply, rgb_event_channel,
};
use crate::error::SessionError;
use crate::projection::{GeoCoord, TerrainProjection};

fn distance_shading(config: &ShadingConfig) -> Result<DistanceShading, MaterialError> {
    DistanceShading {
        near_color: Vec3::from_array(config.near_color),
        far_color: Vec3::from_array(config.far_color),
        min_depth: config.min_depth,
        max_depth: config.max_depth,
    }
    .validated()
}

/// A vector request the engine accepted.
#[must_use = "the mesh is only added to the scene by `finish_vector_load`"]
#[derive(Debug)]
pub struct VectorLoad {
    request: TerrainRequest,
    reply: VectorReply,
}

impl VectorLoad {
    pub fn request(&self) -> &TerrainRequest {
        &self.request
    }
}

/// An RGB request the engine accepted, and what it has delivered so far.
///
/// Keep it after [`TerrainSession::finish_rgb_load`] returns to apply imagery
/// for the remaining tiles with [`TerrainSession::pump_rgb_events`].
#[must_use = "events are only applied by `finish_rgb_load` or `pump_rgb_events`"]
#[derive(Debug)]
pub struct RgbLoad {
    request: TerrainRequest,
    events: RgbEventReceiver,
    dem_tiles: Vec<ObjectId>,
    textured_tiles: Vec<ObjectId>,
}

impl RgbLoad {
    pub fn request(&self) -> &TerrainRequest {
        &self.request
    }

    /// DEM tiles added to the scene, in arrival order.
    pub fn dem_tiles(&self) -> &[ObjectId] {
        &self.dem_tiles
    }

    /// Tiles whose satellite material has been applied.
    pub fn textured_tiles(&self) -> &[ObjectId] {
        &self.textured_tiles
    }

    pub fn is_satellite_ready(&self) -> bool {
        !self.textured_tiles.is_empty()
    }
}

/// Connects a terrain engine to an externally owned scene and camera.
///
/// Tracks the materials it assigned to satellite planes (keyed by plane name)
/// and the DEM tiles that take part in interaction queries.
pub struct TerrainSession<E, B> {
    scene: SharedScene,
    camera: SharedCamera,
    engine: E,
    factory: MaterialFactory,
    disposer: ResourceDisposer<B>,
    shading: DistanceShading,
    satellite_material: SatelliteMaterial,
    cache_root: String,
    vector_loaded: bool,
    rgb_loaded: bool,
    materials: HashMap<String, Arc<Material>>,
    interactives: Vec<ObjectId>,
}

impl<E: TerrainEngine, B: ResourceBackend> TerrainSession<E, B> {
    /// Open a session.
    ///
    /// Fails before contacting the engine when no access token is configured
    /// or the shading depth range is empty. When `debug.debug_title` is set the
    /// engine is pointed at the local tile cache for that location.
    pub fn new(
        scene: SharedScene,
        config: &Config,
        camera: SharedCamera,
        backend: B,
    ) -> Result<Self, SessionError> {
        let access_token = config.terrain.access_token()?.to_string();
        let shading = distance_shading(&config.shading)?;
        let engine = E::connect(EngineOptions {
            access_token,
            units_side: config.terrain.units_side,
        })
        .map_err(SessionError::Connect)?;

        info!(
            units_side = config.terrain.units_side,
            satellite_material = ?config.terrain.satellite_material,
            "terrain session opened"
        );

        let mut session = Self {
            scene,
            camera,
            engine,
            factory: MaterialFactory::new(),
            disposer: ResourceDisposer::new(backend),
            shading,
            satellite_material: config.terrain.satellite_material,
            cache_root: config.terrain.cache_root.clone(),
            vector_loaded: false,
            rgb_loaded: false,
            materials: HashMap::new(),
            interactives: Vec::new(),
        };
        if let Some(title) = &config.debug.debug_title {
            session.set_debug_endpoints(title);
        }
        Ok(session)
    }

    pub fn projection(&self, origin: GeoCoord, radius_km: f64) -> TerrainProjection {
        self.engine.projection(origin, radius_km)
    }

    // -- vector terrain ------------------------------------------------------

    /// Mark vector terrain as loaded and issue the request.
    ///
    /// The flag is set first, so it stays set when the engine refuses.
    pub fn begin_vector_load(&mut self, request: TerrainRequest) -> Result<VectorLoad, SessionError> {
        self.vector_loaded = true;
        let reply = self
            .engine
            .request_vector_terrain(&request)
            .map_err(SessionError::Request)?;
        debug!(zoom = request.zoom, radius_km = request.radius_km, "vector terrain requested");
        Ok(VectorLoad { request, reply })
    }

    /// Wait for the vector mesh, add it to the scene, and redraw once.
    pub async fn finish_vector_load(
        &mut self,
        load: VectorLoad,
        mut redraw: impl FnMut(),
    ) -> Result<ObjectId, SessionError> {
        let object = load
            .reply
            .await
            .map_err(|_| SessionError::Fetch(EngineError::Disconnected))?
            .map_err(SessionError::Fetch)?;
        let id = self.scene.borrow_mut().add(object);
        redraw();
        info!(object = %id, zoom = load.request.zoom, "vector terrain loaded");
        Ok(id)
    }

    pub async fn load_vector_terrain(
        &mut self,
        request: TerrainRequest,
        redraw: impl FnMut(),
    ) -> Result<ObjectId, SessionError> {
        let load = self.begin_vector_load(request)?;
        self.finish_vector_load(load, redraw).await
    }

    // -- RGB terrain ---------------------------------------------------------

    /// Mark RGB terrain as loaded and issue the request.
    pub fn begin_rgb_load(&mut self, request: TerrainRequest) -> Result<RgbLoad, SessionError> {
        self.rgb_loaded = true;
        let (sender, events) = rgb_event_channel();
        self.engine
            .request_rgb_terrain(&request, sender)
            .map_err(SessionError::Request)?;
        debug!(zoom = request.zoom, radius_km = request.radius_km, "rgb terrain requested");
        Ok(RgbLoad {
            request,
            events,
            dem_tiles: Vec::new(),
            textured_tiles: Vec::new(),
        })
    }

    /// Apply engine events until the first satellite material is in place.
    ///
    /// Every DEM tile is added to the scene and the interactive set, with one
    /// redraw per tile. A failure event, or the engine hanging up before any
    /// imagery arrived, ends the load with [`SessionError::Fetch`]; tiles
    /// already added stay in the scene.
    pub async fn finish_rgb_load(
        &mut self,
        load: &mut RgbLoad,
        mut redraw: impl FnMut(),
    ) -> Result<(), SessionError> {
        if load.is_satellite_ready() {
            return Ok(());
        }
        while let Some(event) = load.events.recv().await {
            if self.apply_rgb_event(load, event, &mut redraw)? {
                info!(
                    tiles = load.dem_tiles.len(),
                    zoom = load.request.zoom,
                    "rgb terrain loaded"
                );
                return Ok(());
            }
        }
        Err(SessionError::Fetch(EngineError::Disconnected))
    }

    /// Apply whatever events are queued without waiting. Returns the number
    /// of events applied.
    pub fn pump_rgb_events(
        &mut self,
        load: &mut RgbLoad,
        mut redraw: impl FnMut(),
    ) -> Result<usize, SessionError> {
        let mut applied = 0;
        loop {
            match load.events.try_recv() {
                Ok(event) => {
                    self.apply_rgb_event(load, event, &mut redraw)?;
                    applied += 1;
                }
                Err(TryRecvError::Empty) => return Ok(applied),
                Err(TryRecvError::Disconnected) if load.is_satellite_ready() => return Ok(applied),
                Err(TryRecvError::Disconnected) => {
                    return Err(SessionError::Fetch(EngineError::Disconnected));
                }
            }
        }
    }

    pub async fn load_rgb_terrain(
        &mut self,
        request: TerrainRequest,
        redraw: impl FnMut(),
    ) -> Result<RgbLoad, SessionError> {
        let mut load = self.begin_rgb_load(request)?;
        self.finish_rgb_load(&mut load, redraw).await?;
        Ok(load)
    }

    /// Returns whether the event put a satellite material in place.
    fn apply_rgb_event(
        &mut self,
        load: &mut RgbLoad,
        event: RgbTerrainEvent,
        redraw: &mut impl FnMut(),
    ) -> Result<bool, SessionError> {
        match event {
            RgbTerrainEvent::DemTiles(objects) => {
                debug!(count = objects.len(), "dem tiles received");
                for object in objects {
                    let id = object.id();
                    self.interactives.push(id);
                    self.scene.borrow_mut().add(object);
                    load.dem_tiles.push(id);
                    redraw();
                }
                Ok(false)
            }
            RgbTerrainEvent::SatelliteReady { tile, material } => {
                let applied = self.apply_satellite(tile, material)?;
                if applied {
                    load.textured_tiles.push(tile);
                    redraw();
                }
                Ok(applied)
            }
            RgbTerrainEvent::Failed(err) => {
                warn!(error = %err, "rgb terrain failed");
                Err(SessionError::Fetch(err))
            }
        }
    }

    fn apply_satellite(
        &mut self,
        tile: ObjectId,
        engine_material: Arc<Material>,
    ) -> Result<bool, SessionError> {
        let camera_position = self.camera.borrow().position;
        let material = match self.satellite_material {
            SatelliteMaterial::DistanceShaded => {
                self.factory.distance_shaded(&self.shading, camera_position)?
            }
            SatelliteMaterial::ConstantColor(color) => {
                self.factory.constant_color(Vec3::from_array(color))
            }
            SatelliteMaterial::EngineTexture => Arc::clone(&engine_material),
        };

        let replaced = self.scene.borrow_mut().get_mut(tile).map(|plane| {
            let previous = plane.material.replace(Arc::clone(&material));
            (plane.name.clone(), previous)
        });
        let Some((name, previous)) = replaced else {
            warn!(object = %tile, "satellite imagery for a tile not in the scene; dropped");
            self.release_unshared(material);
            self.release_unshared(engine_material);
            return Ok(false);
        };

        if let Some(previous) = previous {
            self.release_unshared(previous);
        }
        self.release_unshared(engine_material);
        if let Some(old) = self.materials.insert(name.clone(), material) {
            warn!(name = %name, "plane name already had a material; entry replaced");
            self.release_unshared(old);
        }
        debug!(object = %tile, name = %name, "satellite material applied");
        Ok(true)
    }

    /// Dispose a material nothing else references any more.
    fn release_unshared(&mut self, material: Arc<Material>) {
        if let Some(material) = Arc::into_inner(material) {
            self.disposer.dispose_material(&material);
        }
    }

    // -- debug sources -------------------------------------------------------

    /// Point the engine at the cached tiles of a demo location.
    pub fn set_debug_endpoints(&mut self, title: &str) -> DebugEndpoints {
        let endpoints = DebugEndpoints::for_title(&self.cache_root, title);
        self.engine.set_vector_source(&endpoints.vector);
        self.engine.set_rgb_source(&endpoints.rgb);
        self.engine.set_satellite_source(&endpoints.satellite);
        info!(title, location = %endpoints.location, "debug tile sources set");
        endpoints
    }

    // -- bookkeeping ---------------------------------------------------------

    /// Satellite-plane materials by plane name.
    pub fn materials(&self) -> &HashMap<String, Arc<Material>> {
        &self.materials
    }

    /// Dispose every tracked material once and forget them. Returns how many
    /// were disposed. Planes keep their (now released) material until the
    /// caller removes or re-materials them.
    pub fn clear_materials(&mut self) -> usize {
        let count = self.materials.len();
        for (name, material) in self.materials.drain() {
            debug!(name = %name, material = %material.id(), "dispose plane material");
            self.disposer.dispose_material(&material);
        }
        count
    }

    /// Forget the interactive set. Scene membership is untouched.
    pub fn clear_interactives(&mut self) {
        self.interactives.clear();
    }

    pub fn interactives(&self) -> &[ObjectId] {
        &self.interactives
    }

    /// Run `query` over the interactive tiles with all of them visible.
    /// Visibility is restored afterwards, even if `query` panics.
    ///
    /// The scene is mutably borrowed for the duration of `query`.
    pub fn interact<R>(&self, query: impl FnOnce(&Scene, &[ObjectId]) -> R) -> R {
        let mut scene = self.scene.borrow_mut();
        interaction::apply(&mut scene, &self.interactives, query)
    }

    /// Nearest interactive tile hit by `ray`.
    pub fn pick(&self, ray: Ray) -> Option<Intersection> {
        self.interact(|scene, ids| Raycaster::new(ray).first_hit(scene, ids))
    }

    /// Copy the camera position into every distance-shaded plane material.
    /// Returns the number of materials updated.
    pub fn sync_camera_uniforms(&self) -> usize {
        let position = self.camera.borrow().position;
        self.materials
            .values()
            .filter(|material| material.is_distance_shaded())
            .filter(|material| {
                material
                    .set_uniform(uniform_names::CAMERA_POSITION, UniformValue::Vec3(position))
                    .is_ok()
            })
            .count()
    }

    /// Release an object's geometry, material and texture.
    pub fn dispose_object(&mut self, object: &SceneObject) {
        self.disposer.dispose_object(object);
    }

    pub fn vector_loaded(&self) -> bool {
        self.vector_loaded
    }

    pub fn rgb_loaded(&self) -> bool {
        self.rgb_loaded
    }

    pub fn scene(&self) -> &SharedScene {
        &self.scene
    }

    pub fn camera(&self) -> &SharedCamera {
        &self.camera
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn disposer(&self) -> &ResourceDisposer<B> {
        &self.disposer
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::time::Duration;

    use geoview_config::ConfigError;
    use geoview_materials::Texture;
    use geoview_scene::{Camera, ReleaseLog, Released};

    use super::*;
    use crate::mock::{MockEngine, REVOKED_TOKEN, engine_material, tile};

    type Session = TerrainSession<MockEngine, ReleaseLog>;

    fn config() -> Config {
        let mut config = Config::default();
        config.terrain.access_token = Some("pk.test".to_string());
        config
    }

    fn open(config: &Config) -> Result<Session, SessionError> {
        let camera = Camera::default()
            .look_at(Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO)
            .shared();
        TerrainSession::new(Scene::shared(), config, camera, ReleaseLog::new())
    }

    fn session() -> Session {
        open(&config()).unwrap()
    }

    fn request() -> TerrainRequest {
        TerrainRequest::new(GeoCoord::new(46.5763, 7.9904), 5.0, 12)
    }

    // -- construction ----------------------------------------------------

    #[test]
    fn test_missing_token_rejected() {
        let err = open(&Config::default()).err().unwrap();
        assert!(matches!(
            err,
            SessionError::Config(ConfigError::MissingAccessToken)
        ));
    }

    #[test]
    fn test_degenerate_depth_range_rejected() {
        let mut config = config();
        config.shading.min_depth = 2.0;
        config.shading.max_depth = 2.0;
        let err = open(&config).err().unwrap();
        assert!(matches!(
            err,
            SessionError::Material(MaterialError::DegenerateDepthRange { .. })
        ));
    }

    #[test]
    fn test_engine_refusal_surfaces_as_connect_error() {
        let mut config = config();
        config.terrain.access_token = Some(REVOKED_TOKEN.to_string());
        let err = open(&config).err().unwrap();
        assert!(matches!(err, SessionError::Connect(EngineError::Unauthorized)));
    }

    #[test]
    fn test_engine_receives_options() {
        let mut config = config();
        config.terrain.units_side = 2.0;
        let session = open(&config).unwrap();
        assert_eq!(session.engine().options.access_token, "pk.test");
        assert_eq!(session.engine().options.units_side, 2.0);
        assert!(!session.vector_loaded());
        assert!(!session.rgb_loaded());
    }

    #[test]
    fn test_debug_title_in_config_sets_sources() {
        let mut config = config();
        config.debug.debug_title = Some("Akagi".to_string());
        let session = open(&config).unwrap();
        assert_eq!(
            session.engine().rgb_source.as_deref(),
            Some("../../cache/akagi/custom-terrain-rgb")
        );
    }

    #[test]
    fn test_projection_delegates_to_engine() {
        let session = session();
        let proj = session.projection(GeoCoord::new(46.5763, 7.9904), 5.0);
        assert!((proj.units_per_meter - 1.0 / 10_000.0).abs() < 1e-12);
    }

    // -- vector ----------------------------------------------------------

    #[tokio::test]
    async fn test_vector_flag_set_before_reply() {
        let mut session = session();
        let load = session.begin_vector_load(request()).unwrap();
        assert!(session.vector_loaded());
        assert!(session.scene().borrow().is_empty());

        let reply = session.engine_mut().vector_reply.take().unwrap();
        reply.send(Ok(tile("terrain-vector", 0.0))).unwrap();

        let mut redraws = 0;
        let id = session
            .finish_vector_load(load, || redraws += 1)
            .await
            .unwrap();
        assert_eq!(redraws, 1);
        let scene = session.scene().borrow();
        assert_eq!(scene.len(), 1);
        assert!(scene.contains(id));
        assert!(session.interactives().is_empty());
    }

    #[tokio::test]
    async fn test_vector_load_convenience() {
        let mut session = session();
        session.engine_mut().auto_vector = true;
        let mut redraws = 0;
        let id = session
            .load_vector_terrain(request(), || redraws += 1)
            .await
            .unwrap();
        assert_eq!(redraws, 1);
        assert_eq!(session.scene().borrow().ids(), &[id]);
        assert_eq!(session.engine().requests, [request()]);
    }

    #[tokio::test]
    async fn test_vector_fetch_error() {
        let mut session = session();
        let load = session.begin_vector_load(request()).unwrap();
        let reply = session.engine_mut().vector_reply.take().unwrap();
        reply
            .send(Err(EngineError::Fetch("404".to_string())))
            .unwrap();

        let err = session.finish_vector_load(load, || {}).await.unwrap_err();
        assert!(matches!(err, SessionError::Fetch(EngineError::Fetch(_))));
        assert!(session.scene().borrow().is_empty());
    }

    #[tokio::test]
    async fn test_vector_reply_dropped() {
        let mut session = session();
        let load = session.begin_vector_load(request()).unwrap();
        session.engine_mut().vector_reply = None;

        let err = session.finish_vector_load(load, || {}).await.unwrap_err();
        assert!(matches!(err, SessionError::Fetch(EngineError::Disconnected)));
    }

    #[test]
    fn test_vector_refusal_keeps_flag() {
        let mut session = session();
        session.engine_mut().refuse_next = Some(EngineError::Rejected("zoom".to_string()));
        let err = session.begin_vector_load(request()).unwrap_err();
        assert!(matches!(err, SessionError::Request(EngineError::Rejected(_))));
        assert!(session.vector_loaded());
    }

    // -- rgb -------------------------------------------------------------

    #[tokio::test]
    async fn test_rgb_resolves_after_satellite_with_many_batches() {
        let mut session = session();
        let mut load = session.begin_rgb_load(request()).unwrap();
        assert!(session.rgb_loaded());

        let events = session.engine_mut().rgb_events.take().unwrap();
        let mut ids = Vec::new();
        for batch in 0..3 {
            let tiles: Vec<_> = (0..2)
                .map(|i| tile(&format!("dem-rgb-12-{batch}-{i}"), (batch * 2 + i) as f32))
                .collect();
            ids.extend(tiles.iter().map(SceneObject::id));
            events.send(RgbTerrainEvent::DemTiles(tiles)).unwrap();
        }
        events
            .send(RgbTerrainEvent::SatelliteReady {
                tile: ids[0],
                material: engine_material(),
            })
            .unwrap();

        let mut redraws = 0;
        session
            .finish_rgb_load(&mut load, || redraws += 1)
            .await
            .unwrap();

        assert_eq!(redraws, 7);
        assert_eq!(session.interactives(), ids.as_slice());
        assert_eq!(load.dem_tiles(), ids.as_slice());
        assert_eq!(load.textured_tiles(), &[ids[0]]);
        assert_eq!(session.scene().borrow().len(), 6);

        let material = &session.materials()["dem-rgb-12-0-0"];
        assert!(material.is_distance_shaded());
        let scene = session.scene().borrow();
        let plane = scene.get(ids[0]).unwrap();
        assert!(Arc::ptr_eq(plane.material.as_ref().unwrap(), material));
    }

    #[tokio::test]
    async fn test_rgb_resolves_with_single_batch() {
        let mut session = session();
        let mut load = session.begin_rgb_load(request()).unwrap();
        let events = session.engine_mut().rgb_events.take().unwrap();
        let plane = tile("dem-rgb-12-0-0", 0.0);
        let id = plane.id();
        events.send(RgbTerrainEvent::DemTiles(vec![plane])).unwrap();
        events
            .send(RgbTerrainEvent::SatelliteReady {
                tile: id,
                material: engine_material(),
            })
            .unwrap();

        let mut redraws = 0;
        session
            .finish_rgb_load(&mut load, || redraws += 1)
            .await
            .unwrap();
        assert_eq!(redraws, 2);
        assert_eq!(session.materials().len(), 1);
    }

    #[tokio::test]
    async fn test_rgb_resolves_without_dem_batches() {
        let mut session = session();
        let existing = session
            .scene()
            .borrow_mut()
            .add(tile("dem-rgb-12-5-5", 0.0));
        let mut load = session.begin_rgb_load(request()).unwrap();
        let events = session.engine_mut().rgb_events.take().unwrap();
        events
            .send(RgbTerrainEvent::SatelliteReady {
                tile: existing,
                material: engine_material(),
            })
            .unwrap();

        let mut redraws = 0;
        session
            .finish_rgb_load(&mut load, || redraws += 1)
            .await
            .unwrap();
        assert_eq!(redraws, 1);
        assert!(session.interactives().is_empty());
        assert!(session.materials().contains_key("dem-rgb-12-5-5"));
    }

    #[tokio::test]
    async fn test_rgb_pending_until_satellite() {
        let mut session = session();
        let mut load = session.begin_rgb_load(request()).unwrap();
        let events = session.engine_mut().rgb_events.take().unwrap();
        let plane = tile("dem-rgb-12-0-0", 0.0);
        let id = plane.id();
        events.send(RgbTerrainEvent::DemTiles(vec![plane])).unwrap();

        let pending = tokio::time::timeout(
            Duration::from_millis(20),
            session.finish_rgb_load(&mut load, || {}),
        )
        .await;
        assert!(pending.is_err());
        assert_eq!(load.dem_tiles(), &[id]);
        assert!(!load.is_satellite_ready());

        events
            .send(RgbTerrainEvent::SatelliteReady {
                tile: id,
                material: engine_material(),
            })
            .unwrap();
        session.finish_rgb_load(&mut load, || {}).await.unwrap();
        assert!(load.is_satellite_ready());
    }

    #[tokio::test]
    async fn test_rgb_failure_keeps_delivered_tiles() {
        let mut session = session();
        let mut load = session.begin_rgb_load(request()).unwrap();
        let events = session.engine_mut().rgb_events.take().unwrap();
        events
            .send(RgbTerrainEvent::DemTiles(vec![tile("dem-rgb-12-0-0", 0.0)]))
            .unwrap();
        events
            .send(RgbTerrainEvent::Failed(EngineError::Fetch(
                "satellite 503".to_string(),
            )))
            .unwrap();

        let err = session.finish_rgb_load(&mut load, || {}).await.unwrap_err();
        assert!(matches!(err, SessionError::Fetch(EngineError::Fetch(_))));
        assert_eq!(session.scene().borrow().len(), 1);
        assert_eq!(session.interactives().len(), 1);
        assert!(session.materials().is_empty());
    }

    #[tokio::test]
    async fn test_rgb_closed_before_satellite() {
        let mut session = session();
        let mut load = session.begin_rgb_load(request()).unwrap();
        let events = session.engine_mut().rgb_events.take().unwrap();
        events
            .send(RgbTerrainEvent::DemTiles(vec![tile("dem-rgb-12-0-0", 0.0)]))
            .unwrap();
        drop(events);

        let err = session.finish_rgb_load(&mut load, || {}).await.unwrap_err();
        assert!(matches!(err, SessionError::Fetch(EngineError::Disconnected)));
        assert_eq!(session.scene().borrow().len(), 1);
    }

    #[test]
    fn test_rgb_refusal_keeps_flag() {
        let mut session = session();
        session.engine_mut().refuse_next = Some(EngineError::Unauthorized);
        let err = session.begin_rgb_load(request()).unwrap_err();
        assert!(matches!(err, SessionError::Request(EngineError::Unauthorized)));
        assert!(session.rgb_loaded());
    }

    #[tokio::test]
    async fn test_satellite_for_unknown_tile_skipped() {
        let mut session = session();
        let mut load = session.begin_rgb_load(request()).unwrap();
        let events = session.engine_mut().rgb_events.take().unwrap();
        let stray = tile("dem-rgb-12-9-9", 0.0);
        events
            .send(RgbTerrainEvent::SatelliteReady {
                tile: stray.id(),
                material: engine_material(),
            })
            .unwrap();
        drop(events);

        let err = session.finish_rgb_load(&mut load, || {}).await.unwrap_err();
        assert!(matches!(err, SessionError::Fetch(EngineError::Disconnected)));
        assert!(session.materials().is_empty());
    }

    #[tokio::test]
    async fn test_pump_applies_late_imagery() {
        let mut session = session();
        let mut load = session.begin_rgb_load(request()).unwrap();
        let events = session.engine_mut().rgb_events.take().unwrap();
        let tiles = vec![tile("dem-rgb-12-0-0", 0.0), tile("dem-rgb-12-0-1", 1.0)];
        let ids: Vec<_> = tiles.iter().map(SceneObject::id).collect();
        events.send(RgbTerrainEvent::DemTiles(tiles)).unwrap();
        events
            .send(RgbTerrainEvent::SatelliteReady {
                tile: ids[0],
                material: engine_material(),
            })
            .unwrap();
        session.finish_rgb_load(&mut load, || {}).await.unwrap();
        assert_eq!(session.pump_rgb_events(&mut load, || {}).unwrap(), 0);

        events
            .send(RgbTerrainEvent::SatelliteReady {
                tile: ids[1],
                material: engine_material(),
            })
            .unwrap();
        drop(events);

        let mut redraws = 0;
        let applied = session.pump_rgb_events(&mut load, || redraws += 1).unwrap();
        assert_eq!(applied, 1);
        assert_eq!(redraws, 1);
        assert_eq!(load.textured_tiles(), ids.as_slice());
        assert_eq!(session.materials().len(), 2);
    }

    // -- satellite material strategy --------------------------------------

    #[tokio::test]
    async fn test_replaced_engine_material_released() {
        let mut session = session();
        let mut load = session.begin_rgb_load(request()).unwrap();
        let events = session.engine_mut().rgb_events.take().unwrap();
        let plane = tile("dem-rgb-12-0-0", 0.0);
        let id = plane.id();
        let material = engine_material();
        let material_id = material.id();
        let texture_id = material.map().unwrap().id();
        events.send(RgbTerrainEvent::DemTiles(vec![plane])).unwrap();
        events
            .send(RgbTerrainEvent::SatelliteReady { tile: id, material })
            .unwrap();
        session.finish_rgb_load(&mut load, || {}).await.unwrap();

        let log = session.disposer().backend();
        let texture = log.position(Released::Texture(texture_id)).unwrap();
        let material = log.position(Released::Material(material_id)).unwrap();
        assert!(texture < material);
    }

    #[tokio::test]
    async fn test_constant_color_strategy() {
        let mut config = config();
        config.terrain.satellite_material = SatelliteMaterial::ConstantColor([1.0, 0.0, 0.0]);
        let mut session = open(&config).unwrap();
        let mut load = session.begin_rgb_load(request()).unwrap();
        let events = session.engine_mut().rgb_events.take().unwrap();
        let plane = tile("dem-rgb-12-0-0", 0.0);
        let id = plane.id();
        events.send(RgbTerrainEvent::DemTiles(vec![plane])).unwrap();
        events
            .send(RgbTerrainEvent::SatelliteReady {
                tile: id,
                material: engine_material(),
            })
            .unwrap();
        session.finish_rgb_load(&mut load, || {}).await.unwrap();

        let material = &session.materials()["dem-rgb-12-0-0"];
        assert_eq!(
            material.uniform(uniform_names::COLOR),
            Some(UniformValue::Color(Vec3::X))
        );
        assert!(!material.is_distance_shaded());
    }

    #[tokio::test]
    async fn test_engine_texture_strategy_keeps_material() {
        let mut config = config();
        config.terrain.satellite_material = SatelliteMaterial::EngineTexture;
        let mut session = open(&config).unwrap();
        let mut load = session.begin_rgb_load(request()).unwrap();
        let events = session.engine_mut().rgb_events.take().unwrap();
        let plane = tile("dem-rgb-12-0-0", 0.0);
        let id = plane.id();
        let material = engine_material();
        let material_id = material.id();
        events.send(RgbTerrainEvent::DemTiles(vec![plane])).unwrap();
        events
            .send(RgbTerrainEvent::SatelliteReady { tile: id, material })
            .unwrap();
        session.finish_rgb_load(&mut load, || {}).await.unwrap();

        assert_eq!(session.materials()["dem-rgb-12-0-0"].id(), material_id);
        assert!(!session.disposer().is_released(material_id));
    }

    #[tokio::test]
    async fn test_previous_tile_material_released_when_unshared() {
        let mut session = session();
        let mut factory = MaterialFactory::new();
        let placeholder = factory.constant_color(Vec3::ONE);
        let placeholder_id = placeholder.id();
        let plane = tile("dem-rgb-12-0-0", 0.0).with_material(placeholder);
        let id = plane.id();

        let mut load = session.begin_rgb_load(request()).unwrap();
        let events = session.engine_mut().rgb_events.take().unwrap();
        events.send(RgbTerrainEvent::DemTiles(vec![plane])).unwrap();
        events
            .send(RgbTerrainEvent::SatelliteReady {
                tile: id,
                material: engine_material(),
            })
            .unwrap();
        session.finish_rgb_load(&mut load, || {}).await.unwrap();

        assert!(session.disposer().is_released(placeholder_id));
    }

    #[tokio::test]
    async fn test_shared_tile_material_not_released() {
        let mut session = session();
        let mut factory = MaterialFactory::new();
        let shared = factory.constant_color(Vec3::ONE);
        let plane = tile("dem-rgb-12-0-0", 0.0).with_material(Arc::clone(&shared));
        let id = plane.id();

        let mut load = session.begin_rgb_load(request()).unwrap();
        let events = session.engine_mut().rgb_events.take().unwrap();
        events.send(RgbTerrainEvent::DemTiles(vec![plane])).unwrap();
        events
            .send(RgbTerrainEvent::SatelliteReady {
                tile: id,
                material: engine_material(),
            })
            .unwrap();
        session.finish_rgb_load(&mut load, || {}).await.unwrap();

        assert!(!session.disposer().is_released(shared.id()));
    }

    // -- bookkeeping -----------------------------------------------------

    async fn loaded_session(tiles: usize) -> (Session, Vec<ObjectId>) {
        let mut session = session();
        let mut load = session.begin_rgb_load(request()).unwrap();
        let events = session.engine_mut().rgb_events.take().unwrap();
        let objects: Vec<_> = (0..tiles)
            .map(|i| tile(&format!("dem-rgb-12-0-{i}"), i as f32 * 2.0))
            .collect();
        let ids: Vec<_> = objects.iter().map(SceneObject::id).collect();
        events.send(RgbTerrainEvent::DemTiles(objects)).unwrap();
        for &id in &ids {
            events
                .send(RgbTerrainEvent::SatelliteReady {
                    tile: id,
                    material: engine_material(),
                })
                .unwrap();
        }
        session.finish_rgb_load(&mut load, || {}).await.unwrap();
        session.pump_rgb_events(&mut load, || {}).unwrap();
        (session, ids)
    }

    #[tokio::test]
    async fn test_clear_materials_disposes_each_once() {
        let (mut session, _) = loaded_session(3).await;
        assert_eq!(session.materials().len(), 3);
        let plane_materials: Vec<_> = session.materials().values().map(|m| m.id()).collect();
        let before = session.disposer().backend().count_materials();

        assert_eq!(session.clear_materials(), 3);
        assert!(session.materials().is_empty());
        let log = session.disposer().backend();
        assert_eq!(log.count_materials() - before, 3);
        for id in plane_materials {
            assert_eq!(
                log.events
                    .iter()
                    .filter(|&&e| e == Released::Material(id))
                    .count(),
                1
            );
        }

        assert_eq!(session.clear_materials(), 0);
        assert_eq!(session.disposer().backend().count_materials() - before, 3);
    }

    #[tokio::test]
    async fn test_clear_interactives_keeps_scene() {
        let (mut session, ids) = loaded_session(2).await;
        session.clear_interactives();
        assert!(session.interactives().is_empty());
        let scene = session.scene().borrow();
        assert_eq!(scene.len(), 2);
        assert!(ids.iter().all(|&id| scene.contains(id)));
    }

    #[tokio::test]
    async fn test_interact_restores_visibility() {
        let (session, ids) = loaded_session(3).await;
        session.scene().borrow_mut().get_mut(ids[1]).unwrap().visible = false;

        let seen = session.interact(|scene, ids| {
            ids.iter()
                .filter(|&&id| scene.get(id).is_some_and(|o| o.visible))
                .count()
        });
        assert_eq!(seen, 3);
        assert!(!session.scene().borrow().get(ids[1]).unwrap().visible);
    }

    #[tokio::test]
    async fn test_interact_restores_after_panic() {
        let (session, ids) = loaded_session(2).await;
        session.scene().borrow_mut().get_mut(ids[0]).unwrap().visible = false;

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            session.interact(|_, _| -> () { panic!("pick failed") })
        }));
        assert!(outcome.is_err());
        assert!(!session.scene().borrow().get(ids[0]).unwrap().visible);
        assert!(session.scene().borrow().get(ids[1]).unwrap().visible);
    }

    #[tokio::test]
    async fn test_pick_hits_hidden_tile() {
        let (session, ids) = loaded_session(2).await;
        session.scene().borrow_mut().get_mut(ids[1]).unwrap().visible = false;

        let ray = Ray::new(Vec3::new(2.0, 0.0, 5.0), Vec3::NEG_Z).unwrap();
        let hit = session.pick(ray).unwrap();
        assert_eq!(hit.object, ids[1]);
        assert!((hit.distance - 4.5).abs() < 1e-5);
        assert!(!session.scene().borrow().get(ids[1]).unwrap().visible);
    }

    #[tokio::test]
    async fn test_sync_camera_uniforms() {
        let (session, _) = loaded_session(2).await;
        let moved = Vec3::new(1.0, 2.0, 3.0);
        session.camera().borrow_mut().position = moved;

        assert_eq!(session.sync_camera_uniforms(), 2);
        for material in session.materials().values() {
            assert_eq!(
                material.uniform(uniform_names::CAMERA_POSITION),
                Some(UniformValue::Vec3(moved))
            );
        }
    }

    #[test]
    fn test_set_debug_endpoints() {
        let mut session = session();
        let endpoints = session.set_debug_endpoints("Mt. Eiger Trail");
        let engine = session.engine();
        assert_eq!(engine.vector_source.as_deref(), Some(endpoints.vector.as_str()));
        assert_eq!(
            engine.vector_source.as_deref(),
            Some("../../cache/eiger/custom-terrain-vector")
        );
        assert_eq!(
            engine.satellite_source.as_deref(),
            Some("../../cache/eiger/custom-satellite")
        );

        session.set_debug_endpoints("Unknown Peak");
        assert_eq!(
            session.engine().rgb_source.as_deref(),
            Some("../../cache/invalid/custom-terrain-rgb")
        );
    }

    #[test]
    fn test_dispose_object_through_session() {
        let mut session = session();
        let texture = Arc::new(Texture::new("overlay", 8, 8));
        let object = tile("terrain-vector", 0.0).with_texture(Arc::clone(&texture));
        session.dispose_object(&object);
        assert!(session.disposer().is_released(texture.id()));
    }
}
