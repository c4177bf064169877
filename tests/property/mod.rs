mod normalizer_idempotence;
