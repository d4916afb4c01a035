pub mod arch_scene;
