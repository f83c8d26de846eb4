mod stream_device;
