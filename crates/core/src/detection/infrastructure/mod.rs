pub mod contour_face_locator;
pub mod deadline_emotion_classifier;
pub mod deadline_face_locator;
pub mod locator_factory;
pub mod onnx_blazeface_locator;
pub mod random_emotion_classifier;
mod stage_worker;
