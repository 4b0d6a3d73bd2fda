/// Receives the element instructions produced by a [`SyncController`](`crate::sync::SyncController`).
///
/// The sink exclusively owns its visual elements. Each one belongs to a single key at a time.
///
/// # Element lifecycle
///
/// 1. [`create_element`](`RenderSink::create_element`) places a new element at `baseline`.
/// 2. Any number of [`update_element`](`RenderSink::update_element`) and [`set_interpolated`](`RenderSink::set_interpolated`) calls follow.
/// 3. [`remove_element`](`RenderSink::remove_element`) announces the exit. The element keeps receiving [`set_interpolated`](`RenderSink::set_interpolated`) while it animates towards `vanish`.
/// 4. [`release_element`](`RenderSink::release_element`) is the point where the element must be discarded.
///
/// If a key reappears between 3. and 4., its element is revived with [`update_element`](`RenderSink::update_element`) instead of being created again.
pub trait RenderSink<K, V> {
	fn create_element(&mut self, key: &K, baseline: &V, target: &V);
	fn update_element(&mut self, key: &K, baseline: &V, target: &V);
	fn remove_element(&mut self, key: &K, vanish: &V);
	/// Called once per animation tick for each element in transition.
	fn set_interpolated(&mut self, key: &K, value: &V);
	fn release_element(&mut self, key: &K);
}

impl<K, V, S: RenderSink<K, V> + ?Sized> RenderSink<K, V> for &mut S {
	fn create_element(&mut self, key: &K, baseline: &V, target: &V) {
		(**self).create_element(key, baseline, target)
	}

	fn update_element(&mut self, key: &K, baseline: &V, target: &V) {
		(**self).update_element(key, baseline, target)
	}

	fn remove_element(&mut self, key: &K, vanish: &V) {
		(**self).remove_element(key, vanish)
	}

	fn set_interpolated(&mut self, key: &K, value: &V) {
		(**self).set_interpolated(key, value)
	}

	fn release_element(&mut self, key: &K) {
		(**self).release_element(key)
	}
}
