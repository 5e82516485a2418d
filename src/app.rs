use std::sync::Arc;

use anyhow::Context;
use cgmath::{Matrix4, Vector3};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::{FutureExt, StreamExt};
use winit::{
    application::ApplicationHandler,
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes},
};

use crate::assets::{AssetLoader, LoadEvent, LoadedAsset};
use crate::config::{hex_to_linear, SceneConfig};
use crate::error::{InteractionError, RenderError};
use crate::gfx::{
    camera::CameraManager,
    geometry::generate_sphere,
    rendering::RenderEngine,
    resources::Material,
    scene::{Mesh, Object, Scene},
};
use crate::interaction::{InteractiveObject, Interactions, ObjectId, Shape, Viewport};

/// The windowed viewer: owns the event loop until [`run`](Self::run)
pub struct GlowApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    config: SceneConfig,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine>,
    scene: Scene,
    interactions: Interactions,
    loader: Option<AssetLoader>,
    /// Messages from click actions, shown in the title bar
    notices: UnboundedReceiver<String>,
    cursor_position: Option<(f32, f32)>,
    press_position: Option<(f32, f32)>,
    failure: Option<anyhow::Error>,
}

impl GlowApp {
    /// Builds the scene described by `config`; the window opens in `run`
    pub fn new(config: SceneConfig) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new()
            .map_err(|e| anyhow::anyhow!("failed to create event loop: {}", e))?;

        let aspect = config.window.width as f32 / config.window.height as f32;
        let camera_manager =
            CameraManager::new(config.build_camera(aspect), config.build_controller());
        let mut scene = Scene::new(camera_manager);
        let mut interactions = Interactions::new();

        let (notice_sender, notices) = mpsc::unbounded();
        add_spheres(&config, &mut scene, &mut interactions, &notice_sender)
            .context("invalid sphere configuration")?;

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                config,
                window: None,
                render_engine: None,
                scene,
                interactions,
                loader: None,
                notices,
                cursor_position: None,
                press_position: None,
                failure: None,
            },
        })
    }

    /// Runs until the window closes; errors that stopped the loop are returned
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .context("event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        event_loop
            .run_app(&mut self.app_state)
            .map_err(|e| anyhow::anyhow!("event loop terminated abnormally: {}", e))?;

        match self.app_state.failure.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.app_state.scene
    }

    pub fn interactions(&self) -> &Interactions {
        &self.app_state.interactions
    }
}

/// Adds each configured sphere to the scene and registers it for hover and click
pub fn add_spheres(
    config: &SceneConfig,
    scene: &mut Scene,
    interactions: &mut Interactions,
    notices: &UnboundedSender<String>,
) -> Result<(), InteractionError> {
    for sphere in &config.spheres {
        let center = Vector3::from(sphere.position);

        let id = sphere.id.clone();
        let message = sphere.message.clone();
        let notices = notices.clone();
        interactions.register(InteractiveObject::new(
            sphere.id.as_str(),
            Shape::sphere(center, sphere.radius),
            sphere.base_intensity,
            sphere.hover_intensity,
            Box::new(move || -> anyhow::Result<()> {
                log::info!("{} clicked: {}", id, message);
                notices
                    .unbounded_send(message.clone())
                    .context("click notice channel closed")?;
                Ok(())
            }),
        )?)?;

        let material_id = format!("{}/material", sphere.id);
        let [r, g, b] = hex_to_linear(sphere.color);
        let [er, eg, eb] = hex_to_linear(sphere.emissive);
        scene.add_material(
            Material::new(&material_id, [r, g, b, 1.0], sphere.metalness, sphere.roughness)
                .with_emission(er, eg, eb)
                .with_emissive_intensity(sphere.base_intensity),
        );

        let geometry =
            generate_sphere(sphere.radius, sphere.width_segments, sphere.height_segments);
        scene.add_object(
            Object::new(sphere.id.as_str(), vec![Mesh::from_geometry(&geometry)])
                .with_transform(Matrix4::from_translation(center))
                .with_material(&material_id)
                .with_interactive(ObjectId::new(sphere.id.as_str())),
        );
    }
    Ok(())
}

/// Whether a release at `release` still counts as a click on `press`
pub fn is_click(press: (f32, f32), release: (f32, f32), tolerance_px: f32) -> bool {
    let (dx, dy) = (release.0 - press.0, release.1 - press.1);
    dx * dx + dy * dy <= tolerance_px * tolerance_px
}

impl AppState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{:#}", error);
        self.failure = Some(error);
        event_loop.exit();
    }

    fn viewport(&self) -> Option<Viewport> {
        self.window
            .as_ref()
            .and_then(|window| Viewport::from_physical(window.inner_size()))
    }

    fn pointer_moved(&mut self, position: PhysicalPosition<f64>) {
        let position = (position.x as f32, position.y as f32);
        self.cursor_position = Some(position);
        self.refresh_hover(position);
    }

    fn refresh_hover(&mut self, position: (f32, f32)) {
        // Minimised windows have no viewport; skip the event
        let Some(viewport) = self.viewport() else {
            return;
        };
        let update = self.interactions.pointer_moved(
            position,
            viewport,
            &self.scene.camera_manager.camera,
        );

        if update.changed() {
            log::debug!(
                "hover entered {:?} exited {:?} -> {:?}",
                update.entered,
                update.exited,
                update.cursor
            );
        }
        if let Some(window) = &self.window {
            window.set_cursor(update.cursor.icon());
        }
    }

    fn mouse_input(&mut self, state: ElementState, button: MouseButton) {
        if button != MouseButton::Left {
            return;
        }
        match state {
            ElementState::Pressed => {
                self.press_position = self.cursor_position;
                self.scene.camera_manager.set_dragging(true);
            }
            ElementState::Released => {
                self.scene.camera_manager.set_dragging(false);
                let (Some(press), Some(release)) = (self.press_position.take(), self.cursor_position)
                else {
                    return;
                };
                if !is_click(press, release, self.config.controls.click_tolerance_px) {
                    return;
                }
                let Some(viewport) = self.viewport() else {
                    return;
                };
                let report = self.interactions.clicked(
                    release,
                    viewport,
                    &self.scene.camera_manager.camera,
                );
                if !report.is_empty() {
                    log::debug!(
                        "click invoked {:?}, {} failed",
                        report.invoked,
                        report.failed.len()
                    );
                }
            }
        }
    }

    fn keyboard_input(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        if event.state == ElementState::Pressed
            && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
        {
            event_loop.exit();
            return;
        }
        self.scene.camera_manager.process_keyboard_event(event);
    }

    fn resized(&mut self, size: PhysicalSize<u32>) {
        self.scene
            .camera_manager
            .camera
            .resize_projection(size.width, size.height);
        if let Some(render_engine) = self.render_engine.as_mut() {
            render_engine.resize(size.width, size.height);
        }
    }

    /// Inserts whatever the loader has finished since the last frame
    fn drain_assets(&mut self) {
        let Some(loader) = self.loader.as_mut() else {
            return;
        };
        let events = loader.poll();
        let finished = loader.is_finished();

        for event in events {
            self.apply_load_event(event);
        }
        if finished {
            let stats = self.scene.get_statistics();
            log::info!(
                "all assets settled: {} objects, {} materials, {} triangles",
                stats.object_count,
                stats.material_count,
                stats.total_triangles
            );
            self.loader = None;
        }
    }

    fn apply_load_event(&mut self, event: LoadEvent) {
        match event {
            LoadEvent::Loaded { name, asset } => match asset {
                LoadedAsset::Model(model) => {
                    let added = model.add_to_scene(&name, &mut self.scene);
                    log::info!("model '{}' loaded ({} objects)", name, added);
                }
                LoadedAsset::Panel(panel) => {
                    panel.add_to_scene(&name, &mut self.scene);
                    log::info!("panel '{}' loaded", name);
                }
                LoadedAsset::Environment(environment) => {
                    if let Some(render_engine) = self.render_engine.as_mut() {
                        render_engine.set_environment(
                            &environment.texels,
                            environment.width,
                            environment.height,
                        );
                    }
                    log::info!("environment '{}' loaded", name);
                }
            },
            LoadEvent::Failed { name, error } => {
                log::error!("failed to load '{}': {:#}", name, anyhow::Error::new(error));
            }
        }
    }

    fn drain_notices(&mut self) {
        let mut latest = None;
        while let Some(Some(message)) = self.notices.next().now_or_never() {
            latest = Some(message);
        }
        if let (Some(message), Some(window)) = (latest, &self.window) {
            window.set_title(&format!("{} - {}", self.config.window.title, message));
        }
    }

    fn redraw(&mut self) -> Result<(), RenderError> {
        self.drain_assets();
        self.drain_notices();

        if self.render_engine.is_none() {
            return Ok(());
        }

        let camera_moved = self.scene.camera_manager.controller.is_moving();
        self.scene.update();
        // The view slid under a still pointer
        if camera_moved {
            if let Some(position) = self.cursor_position {
                self.refresh_hover(position);
            }
        }

        let Some(render_engine) = self.render_engine.as_mut() else {
            return Ok(());
        };
        self.scene.sync_interactive(&self.interactions);
        self.scene
            .prepare(render_engine.device(), render_engine.queue());
        render_engine.update(&self.scene.camera_manager.camera.uniform);
        render_engine.render_frame(&self.scene)
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(error) => {
                self.fail(event_loop, anyhow::anyhow!("failed to create window: {}", error));
                return;
            }
        };
        self.window = Some(window.clone());

        let size = window.inner_size();
        self.scene
            .camera_manager
            .camera
            .resize_projection(size.width, size.height);

        let lighting = self.config.lighting();
        let bloom = self.config.bloom_settings();
        let renderer = pollster::block_on(RenderEngine::new(
            window.clone(),
            size.width,
            size.height,
            lighting,
            bloom,
            &mut self.scene,
        ));
        let mut renderer = match renderer {
            Ok(renderer) => renderer,
            Err(error) => {
                self.fail(event_loop, anyhow::Error::new(error).context("failed to start renderer"));
                return;
            }
        };
        if !self.config.window.vsync {
            renderer.set_vsync(false);
        }
        self.render_engine = Some(renderer);

        // Assets are requested only now so the environment has an engine to land in
        self.loader = Some(AssetLoader::spawn(self.config.asset_descriptors()));
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CursorMoved { position, .. } => self.pointer_moved(position),
            WindowEvent::MouseInput { state, button, .. } => self.mouse_input(state, button),
            WindowEvent::MouseWheel { delta, .. } => {
                self.scene.camera_manager.process_scroll(&delta);
            }
            WindowEvent::KeyboardInput { event, .. } => self.keyboard_input(event_loop, &event),
            WindowEvent::Resized(size) => self.resized(size),
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                if let Err(error) = self.redraw() {
                    match error {
                        RenderError::Frame(wgpu::SurfaceError::OutOfMemory) => {
                            self.fail(event_loop, anyhow::Error::new(error));
                        }
                        other => log::error!("frame failed: {}", other),
                    }
                }
            }
            _ => (),
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: winit::event::DeviceEvent,
    ) {
        self.scene.camera_manager.process_event(&event);
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::{CameraController, OrbitCamera};
    use crate::interaction::{CursorStyle, PointerState};

    fn setup(config: &SceneConfig) -> (Scene, Interactions, UnboundedReceiver<String>) {
        let camera = config.build_camera(1.5);
        let mut scene = Scene::new(CameraManager::new(camera, CameraController::new(0.01, 0.5)));
        let mut interactions = Interactions::new();
        let (sender, receiver) = mpsc::unbounded();
        add_spheres(config, &mut scene, &mut interactions, &sender).unwrap();
        (scene, interactions, receiver)
    }

    /// Pixel position of a world point in a 1200x800 viewport
    fn project(camera: &OrbitCamera, point: Vector3<f32>) -> (f32, f32) {
        use crate::gfx::camera::Camera;
        let clip = camera.build_view_projection_matrix() * point.extend(1.0);
        let ndc = PointerState::new(clip.x / clip.w, clip.y / clip.w);
        ndc.to_screen(Viewport::new(1200.0, 800.0).unwrap())
    }

    #[test]
    fn default_spheres_are_registered_and_drawn() {
        let (scene, interactions, _) = setup(&SceneConfig::default());
        assert_eq!(interactions.objects().len(), 2);
        let sphere = scene.find_object("sphere1").unwrap();
        assert_eq!(sphere.interactive_id(), Some(&ObjectId::new("sphere1")));
        assert_eq!(sphere.meshes[0].vertex_count(), 17 * 9);
    }

    #[test]
    fn hovering_a_sphere_brightens_its_material() {
        let config = SceneConfig::default();
        let (mut scene, mut interactions, _) = setup(&config);
        let viewport = Viewport::new(1200.0, 800.0).unwrap();

        let at = project(&scene.camera_manager.camera, Vector3::new(2.0, 2.0, 1.0));
        let update = interactions.pointer_moved(at, viewport, &scene.camera_manager.camera);
        assert_eq!(update.cursor, CursorStyle::Pointer);

        scene.sync_interactive(&interactions);
        let material = scene.get_material_for_object(scene.find_object("sphere1").unwrap());
        assert_eq!(material.emissive_intensity, 1.0);
        let other = scene.get_material_for_object(scene.find_object("sphere2").unwrap());
        assert_eq!(other.emissive_intensity, 0.2);
    }

    #[test]
    fn clicking_a_sphere_posts_its_message() {
        let config = SceneConfig::default();
        let (scene, mut interactions, mut notices) = setup(&config);
        let viewport = Viewport::new(1200.0, 800.0).unwrap();

        let at = project(&scene.camera_manager.camera, Vector3::new(5.0, 2.0, -2.0));
        let report = interactions.clicked(at, viewport, &scene.camera_manager.camera);
        assert_eq!(report.invoked, vec![ObjectId::new("sphere2")]);
        assert_eq!(
            notices.next().now_or_never(),
            Some(Some("Sphere 2 click!".to_string()))
        );
    }

    #[test]
    fn duplicate_sphere_ids_are_rejected() {
        let mut config = SceneConfig::default();
        config.spheres[1].id = "sphere1".to_string();
        let camera = config.build_camera(1.0);
        let mut scene = Scene::new(CameraManager::new(camera, CameraController::new(0.01, 0.5)));
        let (sender, _receiver) = mpsc::unbounded();
        let result = add_spheres(&config, &mut scene, &mut Interactions::new(), &sender);
        assert!(matches!(result, Err(InteractionError::DuplicateId(_))));
    }

    #[test]
    fn small_release_offsets_still_click() {
        assert!(is_click((100.0, 100.0), (103.0, 102.0), 4.0));
        assert!(!is_click((100.0, 100.0), (105.0, 100.0), 4.0));
        assert!(is_click((10.0, 10.0), (10.0, 10.0), 0.0));
    }
}
